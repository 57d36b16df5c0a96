use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sonar_core::aggregate::ResultSummary;
use sonar_core::export::write_export;
use sonar_core::targets::{load_targets_from_file, merge_targets};
use sonar_core::{JobConfig, JobEngine, JobId, PauseController, PauseState};
use sonar_scanner::prompts::{active_scan_prompt, custom_scan_prompt, passive_scan_prompt};
use sonar_scanner::{HttpProber, Priority, Summarizer, TargetKind, TargetResult};
use std::io::{self, BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const BANNER: &str = r#"
    ███████╗ ██████╗ ███╗   ██╗ █████╗ ██████╗
    ██╔════╝██╔═══██╗████╗  ██║██╔══██╗██╔══██╗
    ███████╗██║   ██║██╔██╗ ██║███████║██████╔╝
    ╚════██║██║   ██║██║╚██╗██║██╔══██║██╔══██╗
    ███████║╚██████╔╝██║ ╚████║██║  ██║██║  ██║
    ╚══════╝ ╚═════╝ ╚═╝  ╚═══╝╚═╝  ╚═╝╚═╝  ╚═╝
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_blue().bold());
    println!(
        "    {} {}\n",
        "batch recon for subdomains and URLs".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

/// Logs go to stderr so they do not tear the progress bar
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Merge `--target` values with the contents of `--hosts-file`
pub fn load_targets_from_source(
    targets: &[String],
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>> {
    if targets.is_empty() && hosts_file.is_none() {
        bail!("Either --target or --hosts-file must be provided");
    }

    let from_file = match hosts_file {
        Some(path) => {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
            Some(load_targets_from_file(Path::new(&expanded))?)
        }
        None => None,
    };

    let merged = merge_targets(targets.to_vec(), from_file);
    if merged.is_empty() {
        bail!("No targets found to scan");
    }
    Ok(merged)
}

pub fn job_config_from_matches(kind: TargetKind, matches: &ArgMatches) -> JobConfig {
    let provider = matches
        .get_one::<String>("ai-provider")
        .cloned()
        .unwrap_or_default();
    let api_key = matches
        .get_one::<String>("api-key")
        .cloned()
        .unwrap_or_default();

    JobConfig::new(kind)
        .with_deep_crawl(matches.get_flag("deep-crawl"))
        .with_port_scan(matches.get_flag("port-scan"))
        .with_requests_per_second(
            matches
                .get_one::<usize>("requests-per-second")
                .copied()
                .unwrap_or_default(),
        )
        .with_ai(provider, api_key)
}

pub fn output_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// `pause` / `resume` typed while a job runs
pub fn parse_pause_command(line: &str) -> Option<PauseState> {
    line.parse().ok()
}

pub fn format_result_line(result: &TargetResult) -> String {
    if !result.reachable {
        return format!("  {} {}", "✗".red(), result.target.dimmed());
    }

    let priority = match result.priority {
        Priority::High => "[High]".red().bold(),
        Priority::Medium => "[Medium]".yellow().bold(),
        Priority::Low => "[Low]".green(),
    };

    let mut line = format!(
        "  {} {} {} {}",
        "✓".green().bold(),
        priority,
        result.target.bright_white(),
        format!("({})", result.status_code).dimmed()
    );

    if !result.technologies.is_empty() {
        line.push_str(&format!("  {}", result.technologies.join(", ").cyan()));
    }
    let ports = result.open_ports();
    if !ports.is_empty() {
        line.push_str(&format!("  {} {}", "ports:".blue(), ports.join(",")));
    }
    for finding in &result.findings {
        line.push_str(&format!("\n      {} {}", "•".yellow(), finding));
    }
    line
}

fn progress_bar(total: usize, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_message(format!("Queued {} target(s)", total));
    bar
}

/// Read `pause`/`resume` lines from an interactive stdin on a plain thread.
///
/// The thread is detached and dies with the process.
fn spawn_pause_control(pauses: Arc<PauseController>, job_id: JobId, bar: ProgressBar) {
    if !io::stdin().is_terminal() {
        return;
    }

    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_pause_command(&line) {
                Some(state) => {
                    pauses.set(job_id, state);
                    let note = match state {
                        PauseState::Paused => "⏸ Paused, type 'resume' to continue".yellow(),
                        PauseState::Running => "▶ Resumed".green(),
                    };
                    bar.println(note.to_string());
                }
                None if line.trim().is_empty() => {}
                None => bar.println(format!(
                    "{} Unknown command '{}', use 'pause' or 'resume'",
                    "ℹ".blue(),
                    line.trim()
                )),
            }
        }
    });
}

pub async fn handle_scan(kind: TargetKind, sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    init_tracing();

    let explicit: Vec<String> = sub_matches
        .get_many::<String>("target")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");
    let targets = load_targets_from_source(&explicit, hosts_file)?;
    let config = job_config_from_matches(kind, sub_matches);

    if !quiet {
        println!(
            "{} {} {} target(s), {} at a time",
            "→".blue(),
            match kind {
                TargetKind::Subdomain => "Scanning",
                TargetKind::Url => "Analyzing",
            },
            targets.len().to_string().bright_white(),
            config.capacity().to_string().bright_white()
        );
        println!(
            "{} Deep crawl: {}  Port scan: {}",
            "→".blue(),
            config.deep_crawl,
            config.port_scan
        );
        if io::stdin().is_terminal() {
            println!("{} Type 'pause' or 'resume' to control the job\n", "ℹ".blue());
        }
    }

    let prober = HttpProber::new().context("Failed to build HTTP client")?;
    let engine = JobEngine::new(Arc::new(prober));

    let handle = engine.submit_job(targets.clone(), config.clone())?;
    let job_id = handle.id();
    let mut subscription = engine.subscribe(job_id);
    let subscription_handle = subscription.handle();

    let bar = progress_bar(targets.len(), quiet);
    spawn_pause_control(Arc::clone(engine.pauses()), job_id, bar.clone());

    let observer = {
        let bar = bar.clone();
        tokio::spawn(async move {
            while let Some(event) = subscription.next_event().await {
                bar.set_position(u64::from(event.progress));
                bar.set_message(event.message);
                if event.is_final {
                    break;
                }
            }
        })
    };

    let finished = handle.join().await?;
    // Closing the subscription also ends the observer if it joined too late
    // to see the terminal event.
    engine.unsubscribe(job_id, subscription_handle);
    observer.await.context("Progress observer failed")?;
    bar.finish_and_clear();

    let results = engine.fetch_results(job_id).unwrap_or(finished);
    print_results(kind, &results);

    let summarize = sub_matches.get_flag("summarize");
    let question = sub_matches.get_one::<String>("ask");
    if summarize || question.is_some() {
        run_ai_analysis(&config, &results, summarize, question.map(String::as_str)).await;
    }

    if let Some(raw) = sub_matches.get_one::<String>("output") {
        let dir = output_dir(raw);
        let written = write_export(&dir, kind, &results, config.deep_crawl)
            .with_context(|| format!("Failed to export results to {}", dir.display()))?;
        println!(
            "{} Exported {} file(s) to {}",
            "✓".green().bold(),
            written.len(),
            dir.display().to_string().bright_white()
        );
    }

    Ok(())
}

fn print_results(kind: TargetKind, results: &[TargetResult]) {
    let summary = ResultSummary::from_results(results);

    println!();
    print_divider();
    println!(
        "{}",
        format!("  {} RESULTS", kind.label().to_uppercase())
            .bright_white()
            .bold()
    );
    print_divider();
    for result in results {
        println!("{}", format_result_line(result));
    }
    println!();
    println!(
        "  {} {}/{} reachable   {} {}   {} {}   {} {}",
        "Reachable:".blue(),
        summary.reachable.to_string().bright_white(),
        summary.total,
        "High:".red(),
        summary.high,
        "Medium:".yellow(),
        summary.medium,
        "Low:".green(),
        summary.low
    );
    println!();
}

async fn run_ai_analysis(
    config: &JobConfig,
    results: &[TargetResult],
    summarize: bool,
    question: Option<&str>,
) {
    let summarizer = Summarizer::new();

    for result in results.iter().filter(|r| r.reachable) {
        print_divider();
        println!("{} {}", "AI ANALYSIS".bright_blue().bold(), result.target.bright_white());

        if summarize {
            let prompt = if result.endpoints.is_empty() {
                passive_scan_prompt(result)
            } else {
                active_scan_prompt(result)
            };
            let answer = summarizer
                .summarize(&prompt, &config.ai_provider, &config.api_key)
                .await;
            println!("{}\n", answer);
        }

        if let Some(question) = question {
            match custom_scan_prompt(&result.target, &result.report, question) {
                Ok(prompt) => {
                    let answer = summarizer
                        .summarize(&prompt, &config.ai_provider, &config.api_key)
                        .await;
                    println!("{} {}\n{}\n", "Q:".cyan().bold(), question, answer);
                }
                Err(e) => {
                    warn!(target = %result.target, "Skipping question: {}", e);
                    println!("{} {}\n", "✗".red(), e);
                }
            }
        }
    }
}
