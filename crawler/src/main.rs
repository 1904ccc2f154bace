mod config;
mod links;
mod robots;
mod store;

use anyhow::{bail, Context, Result};
use clap::Parser;
use config::CrawlConfig;
use links::{extract_links, normalize_url, parse_seed};
use reqwest::{header, Client};
use robots::RobotsCache;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use store::PageStore;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl pages into data/pages for the indexer, respecting robots.txt")]
struct Cli {
    /// Seed URLs
    urls: Vec<String>,
    /// File with additional seed URLs (one per line, # for comments)
    #[arg(long)]
    seeds: Option<PathBuf>,
    /// JSON `{"seed_urls": [...], "crawl_delay": secs}` used when no seeds or
    /// delay are given on the command line
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    /// Output directory for <hash>.html and <hash>.meta files
    #[arg(long, default_value = "data/pages")]
    output: PathBuf,
    /// Maximum pages to fetch starting from each seed
    #[arg(long, default_value_t = 20)]
    max_pages: usize,
    /// Seconds to wait before each request [default: config file, else 0.005]
    #[arg(long)]
    crawl_delay: Option<f64>,
    /// Concurrent requests per seed
    #[arg(long, default_value_t = 8)]
    concurrency: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
    #[arg(long, default_value = "techscope-bot/0.1")]
    user_agent: String,
    /// Skip responses larger than this many bytes
    #[arg(long, default_value_t = 2 * 1024 * 1024)]
    max_bytes: usize,
}

struct Fetched {
    url: Url,
    status: u16,
    html: String,
    links: Vec<Url>,
}

#[derive(Clone)]
struct Fetcher {
    client: Client,
    robots: Arc<RobotsCache>,
    delay: Duration,
    max_bytes: usize,
}

impl Fetcher {
    /// `Ok(None)` for pages that are disallowed or not HTML.
    async fn fetch(&self, url: Url) -> Result<Option<Fetched>> {
        let rules = self.robots.rules_for(&self.client, &url).await;
        if !rules.as_ref().map_or(true, |r| r.allows_path(url.path())) {
            tracing::debug!(%url, "disallowed by robots.txt");
            return Ok(None);
        }
        let robots_delay = rules.and_then(|r| r.crawl_delay_ms).map(Duration::from_millis);
        sleep(robots_delay.map_or(self.delay, |d| d.max(self.delay))).await;

        let resp = self.client.get(url.clone()).send().await?.error_for_status()?;
        let status = resp.status().as_u16();
        let is_html = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(true, |v| v.starts_with("text/html"));
        if !is_html {
            return Ok(None);
        }
        let bytes = resp.bytes().await?;
        if bytes.len() > self.max_bytes {
            tracing::debug!(%url, bytes = bytes.len(), "page too large");
            return Ok(None);
        }
        let html = String::from_utf8_lossy(&bytes).into_owned();
        let links = extract_links(&html, &url);
        Ok(Some(Fetched { url, status, html, links }))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let mut raw = args.urls.clone();
    if let Some(path) = &args.seeds {
        let txt = fs::read_to_string(path).with_context(|| format!("reading seeds from {}", path.display()))?;
        raw.extend(txt.lines().map(str::to_string));
    }
    raw.retain(|s| !s.trim().is_empty() && !s.trim_start().starts_with('#'));
    let file_config = CrawlConfig::load(&args.config);
    let delay = config::resolve_delay(args.crawl_delay, file_config.as_ref())?;
    let seeds: Vec<Url> = config::resolve_seeds(raw, file_config.as_ref())
        .iter()
        .filter_map(|s| parse_seed(s))
        .collect();
    if seeds.is_empty() {
        bail!("no valid seed URLs in arguments, --seeds or {}", args.config.display());
    }

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;
    let fetcher = Fetcher {
        client,
        robots: Arc::new(RobotsCache::default()),
        delay,
        max_bytes: args.max_bytes,
    };
    let store = PageStore::open(&args.output)?;
    tracing::info!(
        seeds = seeds.len(),
        max_pages = args.max_pages,
        delay_s = delay.as_secs_f64(),
        output = %args.output.display(),
        "crawler starting"
    );

    let mut total = 0usize;
    for (i, seed) in seeds.iter().enumerate() {
        tracing::info!(seed = %seed, "crawling {}/{}", i + 1, seeds.len());
        let saved = crawl_site(&fetcher, &store, seed, args.max_pages, args.concurrency.max(1)).await;
        tracing::info!(seed = %seed, pages = saved, "seed finished");
        total += saved;
    }
    tracing::info!(pages = total, output = %store.dir().display(), "crawl complete");
    Ok(())
}

/// Breadth-first crawl from `seed`, staying on its host. `max_pages` bounds
/// the number of fetch attempts, so failed pages count against it.
async fn crawl_site(fetcher: &Fetcher, store: &PageStore, seed: &Url, max_pages: usize, concurrency: usize) -> usize {
    let host = seed.host_str().map(str::to_string);
    let mut frontier = VecDeque::from([seed.clone()]);
    let mut visited: HashSet<String> = HashSet::new();
    let mut attempted = 0usize;
    let mut saved = 0usize;
    let mut inflight: JoinSet<(Url, Result<Option<Fetched>>)> = JoinSet::new();

    loop {
        while inflight.len() < concurrency && attempted < max_pages {
            let Some(url) = frontier.pop_front() else { break };
            if !visited.insert(normalize_url(&url)) {
                continue;
            }
            attempted += 1;
            let f = fetcher.clone();
            inflight.spawn(async move {
                let res = f.fetch(url.clone()).await;
                (url, res)
            });
        }

        let Some(joined) = inflight.join_next().await else { break };
        let (url, res) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "fetch task failed");
                continue;
            }
        };
        match res {
            Ok(Some(page)) => {
                match store.save(page.url.as_str(), &page.html, page.status) {
                    Ok(path) => {
                        saved += 1;
                        tracing::debug!(url = %page.url, path = %path.display(), "saved");
                        if saved % 20 == 0 {
                            tracing::info!(saved, max_pages, "progress");
                        }
                    }
                    Err(e) => tracing::warn!(url = %page.url, error = %e, "could not save page"),
                }
                for link in page.links {
                    if link.host_str().map(str::to_string) == host && !visited.contains(&normalize_url(&link)) {
                        frontier.push_back(link);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(%url, error = %e, "fetch failed"),
        }
    }
    saved
}
