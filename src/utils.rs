//! String formatting and conversion utilities

use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Shown in place of a publication date that is missing or unreadable.
pub const DATE_PLACEHOLDER: &str = "—";

/// Month abbreviation table used for displayed dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en-US")]
    EnUs,
}

impl Locale {
    fn months(self) -> [&'static str; 12] {
        match self {
            Locale::PtBr => [
                "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
            ],
            Locale::EnUs => [
                "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
            ],
        }
    }

    /// `lang` attribute for rendered pages.
    pub fn tag(self) -> &'static str {
        match self {
            Locale::PtBr => "pt-BR",
            Locale::EnUs => "en-US",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "pt-br" | "pt" => Ok(Locale::PtBr),
            "en-us" | "en" => Ok(Locale::EnUs),
            other => Err(format!("unsupported locale {other:?}")),
        }
    }
}

/// Parse a publication timestamp as emitted by the content API.
/// Accepts "2021-03-25T19:25:28+0000" as well as RFC 3339.
pub fn parse_publication_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a publication date as "DD Mon YYYY" (UTC calendar day).
/// Missing dates yield [`DATE_PLACEHOLDER`].
pub fn format_publication_date(date: Option<&DateTime<Utc>>, locale: Locale) -> String {
    match date {
        Some(dt) => format!(
            "{:02} {} {}",
            dt.day(),
            locale.months()[dt.month0() as usize],
            dt.year()
        ),
        None => DATE_PLACEHOLDER.to_string(),
    }
}

/// Escape double quotes and backslashes for TOML basic string values
/// Also replaces newlines with spaces to ensure single-line TOML strings
pub fn escape_toml_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\n', '\r'], " ")
}

/// Turn a document uid into a file stem that is safe on every platform.
/// Uids are normally slugs already; anything outside `[A-Za-z0-9_-]` becomes '-'.
pub fn page_file_stem(uid: &str) -> String {
    let stem: String = uid
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if stem.is_empty() {
        String::from("untitled")
    } else {
        stem
    }
}
