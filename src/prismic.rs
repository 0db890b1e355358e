//! Prismic REST API (v2) client

use std::time::Duration;

use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{BlogError, Result};
use crate::models::{
    null_to_default, Banner, ContentBlock, PaginationCursor, PostDetail, PostPage, PostSummary,
};
use crate::source::{ContentSource, PageFetcher};
use crate::utils::parse_publication_date;

const USER_AGENT: &str = concat!("spacetraveling/", env!("CARGO_PKG_VERSION"));

/// Page size used when walking every document (the API maximum).
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug)]
pub struct PrismicClient {
    client: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
    master_ref: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct ApiInfo {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    id: String,
    #[serde(rename = "isMasterRef", default)]
    is_master: bool,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct SearchResponse<T> {
    #[serde(default = "first_page")]
    page: u32,
    #[serde(default)]
    next_page: Option<String>,
    #[serde(default)]
    results: Vec<Document<T>>,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Document<T> {
    #[serde(default)]
    id: String,
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    first_publication_date: Option<String>,
    data: T,
}

impl<T> Document<T> {
    /// Documents without a uid fall back to their API id.
    fn identifier(&self) -> String {
        self.uid.clone().unwrap_or_else(|| self.id.clone())
    }

    fn published_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let raw = self.first_publication_date.as_deref()?;
        let parsed = parse_publication_date(raw);
        if parsed.is_none() {
            warn!("unreadable publication date {raw:?} on {}", self.identifier());
        }
        parsed
    }
}

#[derive(Debug, Deserialize)]
struct SummaryData {
    #[serde(default, deserialize_with = "null_to_default")]
    title: String,
    #[serde(default, deserialize_with = "null_to_default")]
    subtitle: String,
    #[serde(default, deserialize_with = "null_to_default")]
    author: String,
}

#[derive(Debug, Deserialize)]
struct PostData {
    #[serde(default, deserialize_with = "null_to_default")]
    title: String,
    #[serde(default, deserialize_with = "null_to_default")]
    subtitle: String,
    #[serde(default, deserialize_with = "null_to_default")]
    author: String,
    #[serde(default, deserialize_with = "null_to_default")]
    banner: Banner,
    #[serde(default, deserialize_with = "null_to_default")]
    content: Vec<ContentBlock>,
}

/// Decode one listing page as returned by a search or a `next_page` URL.
pub fn parse_post_page(body: &str) -> Result<PostPage> {
    let response: SearchResponse<SummaryData> = serde_json::from_str(body)?;
    Ok(into_post_page(response))
}

fn into_post_page(response: SearchResponse<SummaryData>) -> PostPage {
    let summaries = response
        .results
        .into_iter()
        .map(|doc| PostSummary {
            uid: doc.identifier(),
            first_publication_date: doc.published_at(),
            title: doc.data.title,
            subtitle: doc.data.subtitle,
            author: doc.data.author,
        })
        .collect();

    PostPage {
        cursor: PaginationCursor {
            next_page: response.next_page,
            page: response.page.max(1),
        },
        summaries,
    }
}

/// Decode a search for a single uid. `Ok(None)` when nothing matched.
pub fn parse_post_detail(body: &str) -> Result<Option<PostDetail>> {
    let response: SearchResponse<PostData> = serde_json::from_str(body)?;
    Ok(response.results.into_iter().next().map(|doc| PostDetail {
        uid: doc.identifier(),
        first_publication_date: doc.published_at(),
        title: doc.data.title,
        subtitle: doc.data.subtitle,
        author: doc.data.author,
        banner: doc.data.banner,
        content: doc.data.content,
    }))
}

/// Identifiers on one search page plus the raw `next_page` URL.
fn parse_identifiers(body: &str) -> Result<(Vec<String>, Option<String>)> {
    let response: SearchResponse<IgnoredAny> = serde_json::from_str(body)?;
    let uids = response.results.iter().map(Document::identifier).collect();
    Ok((uids, response.next_page))
}

fn find_master_ref(body: &str) -> Result<String> {
    let info: ApiInfo = serde_json::from_str(body)?;
    info.refs
        .into_iter()
        .find(|r| r.is_master)
        .map(|r| r.id)
        .ok_or(BlogError::NoMasterRef)
}

fn type_predicate(document_type: &str) -> String {
    format!("[[at(document.type,\"{}\")]]", quote(document_type))
}

fn uid_predicate(document_type: &str, uid: &str) -> String {
    format!("[[at(my.{}.uid,\"{}\")]]", document_type, quote(uid))
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl PrismicClient {
    /// `endpoint` is the repository API root, e.g. `https://repo.cdn.prismic.io/api/v2`.
    pub fn new(endpoint: &str, access_token: Option<String>) -> Result<Self> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(PrismicClient {
            client,
            endpoint,
            access_token,
            master_ref: OnceCell::new(),
        })
    }

    fn with_token(&self, mut url: Url) -> Url {
        if let Some(token) = &self.access_token {
            if !url.query_pairs().any(|(k, _)| k == "access_token") {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }
        url
    }

    fn search_url(
        &self,
        master_ref: &str,
        predicate: &str,
        page_size: Option<u32>,
    ) -> Result<Url> {
        let root = self.endpoint.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{root}/documents/search"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("ref", master_ref);
            query.append_pair("q", predicate);
            if let Some(size) = page_size {
                query.append_pair("pageSize", &size.to_string());
            }
        }
        Ok(self.with_token(url))
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        debug!("GET {url}");
        let resp = self.client.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(BlogError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.text().await?)
    }

    async fn master_ref(&self) -> Result<&str> {
        let id = self
            .master_ref
            .get_or_try_init(|| async {
                let body = self.get_text(self.with_token(self.endpoint.clone())).await?;
                let id = find_master_ref(&body)?;
                debug!("master ref is {id}");
                Ok::<_, BlogError>(id)
            })
            .await?;
        Ok(id.as_str())
    }
}

#[async_trait]
impl PageFetcher for PrismicClient {
    async fn fetch_page(&self, url: &str) -> Result<PostPage> {
        let url = self.with_token(Url::parse(url)?);
        let body = self.get_text(url).await?;
        parse_post_page(&body)
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    fn name(&self) -> &'static str {
        "prismic"
    }

    async fn query_first_page(&self, document_type: &str, page_size: u32) -> Result<PostPage> {
        let master_ref = self.master_ref().await?;
        let url = self.search_url(master_ref, &type_predicate(document_type), Some(page_size))?;
        let body = self.get_text(url).await?;
        let page = parse_post_page(&body)?;
        info!(
            "fetched {} {document_type} summaries (more pages: {})",
            page.summaries.len(),
            page.cursor.has_more()
        );
        Ok(page)
    }

    async fn query_all_identifiers(&self, document_type: &str) -> Result<Vec<String>> {
        let master_ref = self.master_ref().await?;
        let mut next = Some(self.search_url(
            master_ref,
            &type_predicate(document_type),
            Some(MAX_PAGE_SIZE),
        )?);
        let mut uids = Vec::new();

        while let Some(url) = next.take() {
            let body = self.get_text(url).await?;
            let (found, next_page) = parse_identifiers(&body)?;
            uids.extend(found);
            next = match next_page {
                Some(raw) => Some(self.with_token(Url::parse(&raw)?)),
                None => None,
            };
        }

        info!("found {} {document_type} documents", uids.len());
        Ok(uids)
    }

    async fn get_by_identifier(&self, document_type: &str, uid: &str) -> Result<PostDetail> {
        let master_ref = self.master_ref().await?;
        let url = self.search_url(master_ref, &uid_predicate(document_type, uid), Some(1))?;
        let body = self.get_text(url).await?;
        parse_post_detail(&body)?.ok_or_else(|| BlogError::NotFound {
            document_type: document_type.to_string(),
            uid: uid.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeKind;
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const LISTING_PAGE: &str = r#"{
        "page": 1,
        "results_per_page": 1,
        "results_size": 1,
        "total_results_size": 2,
        "total_pages": 2,
        "next_page": "https://spacetraveling.cdn.prismic.io/api/v2/documents/search?ref=X&q=%5B%5Bat%28document.type%2C+%22post%22%29%5D%5D&page=2&pageSize=1",
        "prev_page": null,
        "results": [{
            "id": "YFzXbBIAACMAYu8X",
            "uid": "como-utilizar-hooks",
            "type": "post",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "last_publication_date": "2021-03-25T19:25:28+0000",
            "data": {
                "title": "Como utilizar Hooks",
                "subtitle": "Pensando em sincronização em vez de ciclos de vida",
                "author": "Joseph Oliveira"
            }
        }]
    }"#;

    const LAST_PAGE: &str = r#"{
        "page": 2,
        "next_page": null,
        "results": [{
            "id": "abc",
            "uid": null,
            "first_publication_date": null,
            "data": {"title": "Criando um app CRA do zero", "subtitle": null, "author": "Danilo Vieira"}
        }]
    }"#;

    const DETAIL: &str = r#"{
        "page": 1,
        "next_page": null,
        "results": [{
            "id": "YFzXbBIAACMAYu8X",
            "uid": "como-utilizar-hooks",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "data": {
                "title": "Como utilizar Hooks",
                "subtitle": "Pensando em sincronização",
                "author": "Joseph Oliveira",
                "banner": {"url": "https://images.prismic.io/banner.png", "alt": null},
                "content": [{
                    "heading": "Proin et varius",
                    "body": [{"type": "paragraph", "text": "Lorem ipsum dolor", "spans": []}]
                }]
            }
        }]
    }"#;

    #[test]
    fn test_parse_post_page_first_page() {
        let page = parse_post_page(LISTING_PAGE).unwrap();
        assert_eq!(page.cursor.page, 1);
        assert!(page.cursor.next_page.as_deref().unwrap().contains("page=2"));
        assert_eq!(page.summaries.len(), 1);

        let post = &page.summaries[0];
        assert_eq!(post.uid, "como-utilizar-hooks");
        assert_eq!(post.title, "Como utilizar Hooks");
        assert_eq!(post.author, "Joseph Oliveira");
        assert_eq!(
            post.first_publication_date,
            Some(Utc.with_ymd_and_hms(2021, 3, 15, 19, 25, 28).unwrap())
        );
    }

    #[test]
    fn test_parse_post_page_last_page_with_nulls() {
        let page = parse_post_page(LAST_PAGE).unwrap();
        assert_eq!(page.cursor, PaginationCursor { next_page: None, page: 2 });

        let post = &page.summaries[0];
        assert_eq!(post.uid, "abc");
        assert_eq!(post.subtitle, "");
        assert_eq!(post.first_publication_date, None);
    }

    #[test]
    fn test_parse_post_page_rejects_garbage() {
        assert!(matches!(
            parse_post_page("<html>rate limited</html>"),
            Err(BlogError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_post_detail() {
        let post = parse_post_detail(DETAIL).unwrap().unwrap();
        assert_eq!(post.uid, "como-utilizar-hooks");
        assert_eq!(
            post.banner.url.as_deref(),
            Some("https://images.prismic.io/banner.png")
        );
        assert_eq!(post.content.len(), 1);
        assert_eq!(post.content[0].heading, "Proin et varius");
        assert_eq!(post.content[0].body[0].kind, NodeKind::Paragraph);
    }

    #[test]
    fn test_parse_post_detail_no_match() {
        let body = r#"{"page": 1, "next_page": null, "results": []}"#;
        assert_eq!(parse_post_detail(body).unwrap(), None);
    }

    #[test]
    fn test_find_master_ref() {
        let body = r#"{"refs": [
            {"id": "preview", "ref": "PREVIEW", "isMasterRef": false},
            {"id": "master", "ref": "YFzXbBIAACMAYu8X", "isMasterRef": true}
        ]}"#;
        assert_eq!(find_master_ref(body).unwrap(), "YFzXbBIAACMAYu8X");
        assert!(matches!(
            find_master_ref(r#"{"refs": []}"#),
            Err(BlogError::NoMasterRef)
        ));
    }

    #[test]
    fn test_predicates() {
        assert_eq!(type_predicate("post"), r#"[[at(document.type,"post")]]"#);
        assert_eq!(
            uid_predicate("post", "say \"hi\""),
            r#"[[at(my.post.uid,"say \"hi\"")]]"#
        );
    }

    #[test]
    fn test_search_url_with_token() {
        let client = PrismicClient::new(
            "https://spacetraveling.cdn.prismic.io/api/v2/",
            Some("secret".to_string()),
        )
        .unwrap();
        let url = client
            .search_url("REF", &type_predicate("post"), Some(1))
            .unwrap();

        assert_eq!(url.path(), "/api/v2/documents/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("ref".to_string(), "REF".to_string()),
                ("q".to_string(), r#"[[at(document.type,"post")]]"#.to_string()),
                ("pageSize".to_string(), "1".to_string()),
                ("access_token".to_string(), "secret".to_string()),
            ]
        );
    }

    #[test]
    fn test_with_token_does_not_duplicate() {
        let client = PrismicClient::new(
            "https://spacetraveling.cdn.prismic.io/api/v2",
            Some("secret".to_string()),
        )
        .unwrap();
        let url = Url::parse("https://x.io/api/v2/documents/search?page=2&access_token=secret")
            .unwrap();
        let url = client.with_token(url);
        assert_eq!(
            url.query_pairs().filter(|(k, _)| k == "access_token").count(),
            1
        );
    }

    #[test]
    fn test_parse_identifiers() {
        let (uids, next) = parse_identifiers(LISTING_PAGE).unwrap();
        assert_eq!(uids, vec!["como-utilizar-hooks"]);
        assert!(next.unwrap().contains("page=2"));

        let (uids, next) = parse_identifiers(LAST_PAGE).unwrap();
        assert_eq!(uids, vec!["abc"]);
        assert_eq!(next, None);
    }

    /// Answers every request with `route(base_url, request_target)` and
    /// records the request targets.
    struct StubServer {
        base: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl StubServer {
        async fn start(route: fn(&str, &str) -> (u16, String)) -> StubServer {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));

            let (server_base, log) = (base.clone(), Arc::clone(&requests));
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let mut head = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => head.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&head);
                    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                    log.lock().unwrap().push(target.clone());

                    let (status, body) = route(&server_base, &target);
                    let response = format!(
                        "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });

            StubServer { base, requests }
        }

        fn endpoint(&self) -> String {
            format!("{}/api/v2", self.base)
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn is_api_root(target: &str) -> bool {
        target == "/api/v2" || target.starts_with("/api/v2?")
    }

    const REFS: &str = r#"{"refs": [{"id": "master", "ref": "MASTER", "isMasterRef": true}]}"#;

    #[tokio::test]
    async fn test_master_ref_is_fetched_once() {
        let server = StubServer::start(|_, target| {
            if is_api_root(target) {
                (200, REFS.to_string())
            } else {
                (200, DETAIL.to_string())
            }
        })
        .await;
        let client = PrismicClient::new(&server.endpoint(), None).unwrap();

        let page = client.query_first_page("post", 1).await.unwrap();
        assert_eq!(page.summaries[0].uid, "como-utilizar-hooks");
        let post = client
            .get_by_identifier("post", "como-utilizar-hooks")
            .await
            .unwrap();
        assert_eq!(post.content[0].heading, "Proin et varius");

        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests.iter().filter(|t| is_api_root(t)).count(), 1);
        assert!(requests[1..]
            .iter()
            .all(|t| t.starts_with("/api/v2/documents/search?ref=MASTER&")));
    }

    #[tokio::test]
    async fn test_query_all_identifiers_follows_next_page_with_token() {
        let server = StubServer::start(|base, target| {
            if is_api_root(target) {
                (200, REFS.to_string())
            } else if target.contains("page=2") {
                (
                    200,
                    r#"{"page": 2, "next_page": null, "results": [{"id": "2", "uid": "cra", "data": {}}]}"#
                        .to_string(),
                )
            } else {
                (
                    200,
                    format!(
                        r#"{{"page": 1, "next_page": "{base}/api/v2/documents/search?ref=MASTER&page=2", "results": [{{"id": "1", "uid": "hooks", "data": {{"title": "x"}}}}]}}"#
                    ),
                )
            }
        })
        .await;
        let client = PrismicClient::new(&server.endpoint(), Some("secret".to_string())).unwrap();

        let uids = client.query_all_identifiers("post").await.unwrap();

        assert_eq!(uids, vec!["hooks", "cra"]);
        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|t| t.contains("access_token=secret")));
        assert!(requests[1].contains("pageSize=100"));
        assert!(requests[2].contains("page=2"));
    }

    #[tokio::test]
    async fn test_get_by_identifier_not_found() {
        let server = StubServer::start(|_, target| {
            if is_api_root(target) {
                (200, REFS.to_string())
            } else {
                (200, r#"{"page": 1, "next_page": null, "results": []}"#.to_string())
            }
        })
        .await;
        let client = PrismicClient::new(&server.endpoint(), None).unwrap();

        let err = client.get_by_identifier("post", "gone").await.unwrap_err();

        assert!(err.is_not_found());
        assert!(matches!(
            err,
            BlogError::NotFound { ref document_type, ref uid } if document_type == "post" && uid == "gone"
        ));
    }

    #[tokio::test]
    async fn test_fetch_page_error_status() {
        let server = StubServer::start(|_, _| (503, "{}".to_string())).await;
        let client = PrismicClient::new(&server.endpoint(), None).unwrap();

        let url = format!("{}/documents/search?ref=MASTER&page=2", server.endpoint());
        let err = client.fetch_page(&url).await.unwrap_err();

        assert!(matches!(err, BlogError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_missing_master_ref() {
        let server = StubServer::start(|_, _| (200, r#"{"refs": []}"#.to_string())).await;
        let client = PrismicClient::new(&server.endpoint(), None).unwrap();

        let err = client.query_first_page("post", 1).await.unwrap_err();

        assert!(matches!(err, BlogError::NoMasterRef));
    }
}
