use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{Parser, Subcommand};
use error::AppError;
use log::LevelFilter;
use modscrape::{
    repository::DEFAULT_PAGE_LIMIT, CrawlerBuilder, ExecutionMode, ListingScraper, ModRecord,
    Order, ScrapeContext, ScrapeError, ScraperConfig, SearchScraper, Spider, SqliteRepository,
};

mod error;

const SPIDERS: [&str; 2] = ["listing", "search"];
const PAGE_DELAY: Duration = Duration::from_millis(250);

#[derive(Subcommand)]
pub enum Command {
    /// List all spiders
    Spiders,

    /// Scrape the resource listing
    Listing {
        /// Sort order of the listing
        #[arg(long, default_value_t = Order::Date)]
        order: Order,

        /// First page to scrape
        #[arg(long, default_value_t = 1)]
        start: u32,

        /// Number of pages to scrape
        #[arg(long, default_value_t = 1)]
        pages: u32,

        /// Print records as JSON lines instead of saving them
        #[arg(long)]
        dry_run: bool,
    },

    /// Scrape search results for a query
    Search {
        /// Free-text query
        query: String,

        /// First page to scrape
        #[arg(long, default_value_t = 1)]
        start: u32,

        /// Number of pages to scrape
        #[arg(long, default_value_t = 1)]
        pages: u32,

        /// Match the query against all fields, not only titles
        #[arg(long)]
        all_fields: bool,

        /// Print records as JSON lines instead of saving them
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a page of the stored catalog as JSON
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u32,
    },
}

#[derive(Parser)]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// SQLite catalog
    #[arg(long, global = true, env = "MODSCRAPE_DB", default_value = "data/mods.sqlite")]
    db: PathBuf,

    /// Maximum in-flight secondary fetches
    #[arg(long, global = true, default_value_t = 8)]
    concurrency: usize,

    /// Fetch everything one request at a time
    #[arg(long, global = true, conflicts_with = "concurrency")]
    sequential: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 10)]
    timeout: u64,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn config(&self) -> ScraperConfig {
        let mode = if self.sequential {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Concurrent {
                limit: self.concurrency,
            }
        };
        ScraperConfig::default()
            .with_mode(mode)
            .with_request_timeout(Duration::from_secs(self.timeout))
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match &cli.command {
        Command::Spiders => {
            println!("Listing all spiders...");
            for name in SPIDERS {
                println!("{}", name);
            }
        }
        Command::Listing {
            order,
            start,
            pages,
            dry_run,
        } => {
            let context = Arc::new(ScrapeContext::http(cli.config())?);
            let spider = ListingScraper::new(context)
                .order(*order)
                .pages(*start, *pages);
            run(spider, &cli.db, *dry_run).await?;
        }
        Command::Search {
            query,
            start,
            pages,
            all_fields,
            dry_run,
        } => {
            let context = Arc::new(ScrapeContext::http(cli.config())?);
            let spider = SearchScraper::new(context, query.as_str())
                .title_only(!all_fields)
                .pages(*start, *pages);
            run(spider, &cli.db, *dry_run).await?;
        }
        Command::List { page, limit } => {
            let repository = open_repository(&cli.db)?;
            let catalog = repository.page(*page, *limit)?;
            println!("{}", serde_json::to_string_pretty(&catalog)?);
            repository.close()?;
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn open_repository(path: &Path) -> Result<SqliteRepository, AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(SqliteRepository::open(path)?)
}

async fn run<S>(spider: S, db: &Path, dry_run: bool) -> Result<(), AppError>
where
    S: Spider<Item = ModRecord, Error = ScrapeError>,
{
    if dry_run {
        return print_records(&spider).await;
    }

    let repository = Arc::new(open_repository(db)?);
    let crawler = CrawlerBuilder::new().delay(PAGE_DELAY).build();
    let report = crawler.crawl(spider, repository.clone()).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Ok(repository) = Arc::try_unwrap(repository) {
        repository.close()?;
    }
    Ok(())
}

async fn print_records<S>(spider: &S) -> Result<(), AppError>
where
    S: Spider<Item = ModRecord, Error = ScrapeError>,
{
    for (position, url) in spider.start_urls().into_iter().enumerate() {
        if position > 0 {
            tokio::time::sleep(PAGE_DELAY).await;
        }
        match spider.scrape(&url).await {
            Ok(scraped) => {
                for record in &scraped.items {
                    println!("{}", serde_json::to_string(record)?);
                }
            }
            Err(err) if position == 0 => return Err(err.into()),
            Err(err) => log::error!("{}: {}", url, err),
        }
    }
    Ok(())
}
