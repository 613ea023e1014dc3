use anyhow::{Context, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use siteaudit_core::events::{AuditEvent, EventBus, EventKind};
use siteaudit_core::list::audit_list;
use siteaudit_core::report::{ReportFormat, generate_page_report, render_report, save_report};
use siteaudit_core::{
    AuditConfig, AuditOptions, Checks, CrawlRequest, CrawlState, Crawler, PageAuditor, PageResult,
};
use siteaudit_scanner::HttpRenderer;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

/// Load URLs from a hosts file if given, otherwise from the `--url` values
pub fn load_urls_from_source(
    urls: &[Url],
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if !urls.is_empty() {
        Ok(urls.iter().map(|url| url.as_str().to_string()).collect())
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| parse_url_line(line.trim()))
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, adding http:// when it has no scheme
pub fn parse_url_line(line: &str) -> Option<String> {
    let candidate = if line.contains("://") {
        line.to_string()
    } else {
        format!("http://{}", line)
    };

    match Url::parse(&candidate) {
        Ok(url) if url.host_str().is_some() => Some(candidate),
        _ => {
            eprintln!("{} Skipping invalid URL '{}'", "⚠".yellow(), line);
            None
        }
    }
}

/// Start from `base` and turn off every check named by `--skip`
pub fn checks_from_args(base: Checks, args: &ArgMatches) -> Checks {
    args.get_many::<String>("skip")
        .into_iter()
        .flatten()
        .fold(base, |checks, name| checks.without(name))
}

pub fn keywords_from_args(args: &ArgMatches) -> Vec<String> {
    args.get_many::<String>("keyword")
        .into_iter()
        .flatten()
        .map(|phrase| phrase.trim().to_string())
        .filter(|phrase| !phrase.is_empty())
        .collect()
}

fn format_from_args(args: &ArgMatches) -> ReportFormat {
    args.get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text)
}

fn timeout_from_args(args: &ArgMatches) -> Duration {
    Duration::from_secs(*args.get_one::<u64>("timeout").unwrap_or(&30))
}

pub fn print_banner() {
    let rule = "═".repeat(60);
    eprintln!("{}", rule.bright_blue().bold());
    eprintln!(
        "{}",
        format!("  SITEAUDIT v{}", env!("CARGO_PKG_VERSION"))
            .bright_white()
            .bold()
    );
    eprintln!("{}", rule.bright_blue().bold());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// Ask the crawl to stop and keep the pages already audited.
    Cancel,
    /// Exit immediately without waiting for pages in flight.
    Abort,
}

/// What the `n`th Ctrl-C during a crawl does.
pub fn interrupt_action(n: usize) -> InterruptAction {
    if n <= 1 {
        InterruptAction::Cancel
    } else {
        InterruptAction::Abort
    }
}

fn spinner(quiet: bool) -> anyhow::Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

pub async fn handle_crawl(args: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let url = args
        .get_one::<Url>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;

    let mut config = AuditConfig::from_env().with_page_timeout(timeout_from_args(args));
    if let Some(threads) = args.get_one::<usize>("threads") {
        config = config.with_workers(*threads);
    }
    if let Some(max_pages) = args.get_one::<usize>("max-pages") {
        config = config.with_page_cap(*max_pages);
    }

    let checks = checks_from_args(Checks::all(), args);
    let keywords = keywords_from_args(args);
    let format = format_from_args(args);
    let output = args.get_one::<PathBuf>("output");

    let task_id = Uuid::new_v4().to_string();
    let bus = EventBus::default();
    let renderer = Arc::new(HttpRenderer::new().context("Failed to build HTTP client")?);
    let crawler = Crawler::new(renderer, config.clone()).with_events(bus.clone());

    if !quiet {
        eprintln!(
            "\n{} Crawling {} ({} workers, up to {} pages)\n",
            "→".blue(),
            url.as_str().bright_white(),
            config.workers,
            config.page_cap
        );
    }

    let progress = spinner(quiet)?;
    progress.set_message("starting");

    let progress_task = {
        let mut subscription = bus.subscribe(&task_id);
        let progress = progress.clone();
        tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                if event.event != EventKind::Page {
                    continue;
                }
                progress.set_message(format!(
                    "{} pages | {}",
                    event.total().unwrap_or(0),
                    event.url().unwrap_or("")
                ));
            }
        })
    };

    let cancel_task = {
        let bus = bus.clone();
        let task_id = task_id.clone();
        let progress = progress.clone();
        tokio::spawn(async move {
            let mut interrupts = 0;
            while tokio::signal::ctrl_c().await.is_ok() {
                interrupts += 1;
                match interrupt_action(interrupts) {
                    InterruptAction::Cancel => {
                        progress.set_message("cancelling, waiting for pages in flight");
                        info!("Interrupt received, cancelling crawl {}", task_id);
                        bus.publish(AuditEvent::cancel(&task_id));
                    }
                    InterruptAction::Abort => {
                        progress.abandon();
                        warn!("Second interrupt received, aborting crawl {}", task_id);
                        std::process::exit(130);
                    }
                }
            }
        })
    };

    let request = CrawlRequest::new(url.as_str())
        .with_keywords(keywords)
        .with_checks(checks)
        .with_task_id(task_id.clone());
    let result = crawler.crawl(request).await;

    cancel_task.abort();
    progress_task.abort();
    progress.finish_and_clear();

    let report = result?;

    if !quiet {
        let marker = match report.state {
            CrawlState::Cancelled => "⚠".yellow().bold(),
            _ => "✓".green().bold(),
        };
        eprintln!(
            "{} Crawl {}: {} pages, {} warnings\n",
            marker,
            report.state.as_str(),
            report.pages.len(),
            report.warning_total()
        );
    }

    let rendered = render_report(&report, format)?;

    match output {
        Some(path) => {
            save_report(&rendered, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !quiet {
                eprintln!("{} Report saved to {}", "✓".green().bold(), path.display());
            }
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

pub async fn handle_page(args: &ArgMatches) -> anyhow::Result<()> {
    let url = args
        .get_one::<Url>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;

    let config = AuditConfig::from_env();
    let checked_paths: Vec<String> = args
        .get_many::<String>("checked-path")
        .into_iter()
        .flatten()
        .cloned()
        .collect();
    let options = AuditOptions::new(keywords_from_args(args), checks_from_args(Checks::all(), args))
        .with_checked_paths(checked_paths);

    let auditor = PageAuditor::new(
        Arc::new(HttpRenderer::new().context("Failed to build HTTP client")?),
        Arc::new(config.link_verifier()?),
        timeout_from_args(args),
    );

    let result = auditor.audit_url(url.as_str(), &options).await?;
    print_page_result(&result, format_from_args(args))
}

pub async fn handle_list(args: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let urls: Vec<Url> = args
        .get_many::<Url>("url")
        .into_iter()
        .flatten()
        .cloned()
        .collect();
    let urls = load_urls_from_source(&urls, args.get_one::<PathBuf>("hosts-file"))
        .map_err(anyhow::Error::msg)?;

    let mut config = AuditConfig::from_env();
    if let Some(tabs) = args.get_one::<usize>("tabs") {
        config = config.with_list_tabs(*tabs);
    }

    let mut base = Checks::list_defaults();
    if args.get_flag("links") {
        base.links = true;
    }
    let options = AuditOptions::new(keywords_from_args(args), checks_from_args(base, args));
    let format = format_from_args(args);

    if !quiet {
        eprintln!(
            "{} Auditing {} pages in {} lanes",
            "→".blue(),
            urls.len(),
            config.list_tabs
        );
    }

    let auditor = Arc::new(PageAuditor::new(
        Arc::new(HttpRenderer::new().context("Failed to build HTTP client")?),
        Arc::new(config.link_verifier()?),
        timeout_from_args(args),
    ));

    let mut results = audit_list(auditor, urls, options, config.list_tabs);
    while let Some(result) = results.recv().await {
        print_page_result(&result, format)?;
    }

    Ok(())
}

fn print_page_result(result: &PageResult, format: ReportFormat) -> anyhow::Result<()> {
    match format {
        ReportFormat::Json => println!("{}", serde_json::to_string(result)?),
        ReportFormat::Text => print!("{}", generate_page_report(result)),
    }
    Ok(())
}
