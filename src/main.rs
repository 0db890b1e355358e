use std::path::PathBuf;

use anyhow::{Context, Result};
use argh::FromArgs;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use spacetraveling::{
    estimate_read_time, format_publication_date,
    markdown::escape_markdown,
    render::summary_line,
    richtext::as_markdown,
    site::{build_site, export_markdown},
    ContentSource, Listing, PrismicClient, SiteConfig,
};

#[derive(FromArgs, Debug)]
#[argh(description = "Blog front-end for a Prismic repository")]
struct Cli {
    /// TOML config file; environment variables override it
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum Command {
    Build(BuildCmd),
    List(ListCmd),
    Show(ShowCmd),
    Export(ExportCmd),
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "build", description = "generate the static site")]
struct BuildCmd {
    /// output directory, overrides the configured one
    #[argh(option, short = 'o')]
    output_dir: Option<PathBuf>,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "list", description = "print the post listing")]
struct ListCmd {
    /// keep loading pages until none are left
    #[argh(switch, short = 'a')]
    all: bool,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "show", description = "print one post with its read time")]
struct ShowCmd {
    /// uid of the post
    #[argh(positional)]
    uid: String,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "export", description = "export every post as Markdown")]
struct ExportCmd {
    /// destination directory
    #[argh(option, short = 'd', default = "PathBuf::from(\"./content/posts\")")]
    dir: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_writer(std::io::stderr)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(LevelFilter::INFO.into())
                        .from_env_lossy(),
                ),
        )
        .init();

    let cli: Cli = argh::from_env();
    info!("Started with arguments: {cli:?}");

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = SiteConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let client = PrismicClient::new(&config.api_endpoint, config.access_token.clone())?;

    match cli.command {
        Command::Build(cmd) => {
            if let Some(dir) = cmd.output_dir {
                config.output_dir = dir;
            }
            let report = build_site(&client, &config).await?;
            if !report.missing.is_empty() {
                info!("missing documents: {}", report.missing.join(", "));
            }
        }
        Command::List(cmd) => list(&client, &config, cmd.all).await?,
        Command::Show(cmd) => show(&client, &config, &cmd.uid).await?,
        Command::Export(cmd) => {
            export_markdown(&client, &config, &cmd.dir).await?;
        }
    }

    Ok(())
}

async fn list(client: &PrismicClient, config: &SiteConfig, all: bool) -> Result<()> {
    let first = client
        .query_first_page(&config.document_type, config.page_size)
        .await?;
    let mut listing = Listing::new(first);
    for post in listing.posts() {
        println!("{}", summary_line(post, config.locale));
    }

    if all {
        let shown = listing.posts().len();
        listing.load_all(client).await?;
        for post in &listing.posts()[shown..] {
            println!("{}", summary_line(post, config.locale));
        }
    }

    if listing.has_more() {
        println!("(page {}; more posts available, run with --all)", listing.current_page());
    }
    Ok(())
}

async fn show(client: &PrismicClient, config: &SiteConfig, uid: &str) -> Result<()> {
    let post = client
        .get_by_identifier(&config.document_type, uid)
        .await
        .with_context(|| format!("fetching post {uid:?}"))?;

    println!("{}", post.title);
    println!(
        "{} | {} | {} min",
        format_publication_date(post.first_publication_date.as_ref(), config.locale),
        post.author,
        estimate_read_time(&post.content)
    );
    for block in &post.content {
        println!("\n## {}\n", escape_markdown(&block.heading, true));
        println!("{}", as_markdown(&block.body));
    }
    Ok(())
}
