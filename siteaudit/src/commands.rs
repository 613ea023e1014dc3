use crate::CLAP_STYLING;
use clap::{ArgAction, arg, command};
use siteaudit_core::Checks;
use url::Url;

fn keyword_arg() -> clap::Arg {
    arg!(-k --"keyword" <PHRASE>)
        .required(false)
        .help("Keyword phrase to look for; every word must appear on the page. Repeatable.")
        .action(ArgAction::Append)
}

fn skip_arg() -> clap::Arg {
    arg!(--"skip" <CHECK>)
        .required(false)
        .help("Disable a check. Repeatable.")
        .value_parser(Checks::NAMES)
        .action(ArgAction::Append)
}

fn timeout_arg() -> clap::Arg {
    arg!(--"timeout" <SECONDS>)
        .required(false)
        .help("Per-page render timeout in seconds")
        .value_parser(clap::value_parser!(u64))
        .default_value("30")
}

fn format_arg() -> clap::Arg {
    arg!(-f --"format" <FORMAT>)
        .required(false)
        .help("Output format: text, json")
        .value_parser(["text", "json"])
        .default_value("text")
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("siteaudit")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("siteaudit")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and progress output").required(false))
        .arg(arg!(-v --"verbose" "Log debug detail to stderr").required(false))
        .subcommand_required(true)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl a site from a start URL and audit every same-host page up to the \
                page cap.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The URL to start crawling from")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(keyword_arg())
                .arg(skip_arg())
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("Number of pages audited in parallel (default: SITEAUDIT_WORKERS or 5)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"max-pages" <NUM_PAGES>)
                        .required(false)
                        .help("Maximum number of pages in the report")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("20"),
                )
                .arg(timeout_arg())
                .arg(format_arg())
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
        .subcommand(
            command!("page")
                .about("Audit a single page without following its links")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The page to audit")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(keyword_arg())
                .arg(skip_arg())
                .arg(
                    arg!(--"checked-path" <PATH>)
                        .required(false)
                        .help("Link path already verified; links under it are not probed. Repeatable.")
                        .action(ArgAction::Append),
                )
                .arg(timeout_arg())
                .arg(format_arg()),
        )
        .subcommand(
            command!("list")
                .about(
                    "Audit an explicit list of pages. Link checks are off unless re-enabled \
                with --links.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("A page to audit. Repeatable.")
                        .value_parser(clap::value_parser!(Url))
                        .action(ArgAction::Append)
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of URLs to audit")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(keyword_arg())
                .arg(skip_arg())
                .arg(
                    arg!(--"links")
                        .required(false)
                        .help("Also probe every link for liveness")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"tabs" <NUM_LANES>)
                        .required(false)
                        .help("Number of pages audited in parallel (default: SITEAUDIT_TABS or 2)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(timeout_arg())
                .arg(format_arg()),
        )
}
