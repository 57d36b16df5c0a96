use clap::{ArgAction, arg, command, value_parser};
use std::path::PathBuf;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sonar")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sonar")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(scan_arguments(
            command!("subdomains").about(
                "Probe a batch of subdomains over HTTPS/HTTP and rank them by how interesting \
                they look.",
            ),
            "A subdomain to probe (repeatable)",
        ))
        .subcommand(scan_arguments(
            command!("urls").about(
                "Analyze a batch of URLs for exposed headers, sensitive links, login forms and \
                leaked keys.",
            ),
            "A URL to analyze (repeatable)",
        ))
}

fn scan_arguments(cmd: clap::Command, target_help: &'static str) -> clap::Command {
    cmd.arg(
        arg!(-t --"target" <TARGET>)
            .required(false)
            .help(target_help)
            .action(ArgAction::Append),
    )
    .arg(
        arg!(-H --"hosts-file" <PATH>)
            .required(false)
            .help("Path to a newline-delimited file of targets, merged after --target")
            .value_parser(value_parser!(PathBuf)),
    )
    .arg(
        arg!(--"deep-crawl")
            .required(false)
            .help("Collect headers, technologies and linked endpoints for each target")
            .action(ArgAction::SetTrue),
    )
    .arg(
        arg!(--"port-scan")
            .required(false)
            .help("TCP connect-scan the well-known ports of each reachable host")
            .action(ArgAction::SetTrue),
    )
    .arg(
        arg!(-r --"requests-per-second" <NUM>)
            .required(false)
            .help("Maximum number of targets probed at the same time")
            .value_parser(value_parser!(usize))
            .default_value("10"),
    )
    .arg(
        arg!(--"ai-provider" <PROVIDER>)
            .required(false)
            .help("Provider used for --summarize and --ask")
            .value_parser(["google", "openai", "deepseek"])
            .default_value("openai"),
    )
    .arg(
        arg!(--"api-key" <KEY>)
            .required(false)
            .help("API key for the AI provider")
            .env("SONAR_API_KEY")
            .hide_env_values(true),
    )
    .arg(
        arg!(--"summarize")
            .required(false)
            .help("Ask the AI provider to summarize every reachable target")
            .action(ArgAction::SetTrue),
    )
    .arg(
        arg!(--"ask" <QUESTION>)
            .required(false)
            .help("Ask the AI provider a question about every reachable target"),
    )
    .arg(
        arg!(-o --"output" <DIR>)
            .required(false)
            .help("Directory to export the reachable list (and deep-crawl reports) to"),
    )
}
