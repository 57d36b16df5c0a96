use colored::Colorize;
use sonar::command_argument_builder;
use sonar::handlers::{handle_scan, print_banner};
use sonar_scanner::TargetKind;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let outcome = match chosen_command.subcommand() {
        Some(("subdomains", primary_command)) => {
            handle_scan(TargetKind::Subdomain, primary_command, quiet).await
        }
        Some(("urls", primary_command)) => handle_scan(TargetKind::Url, primary_command, quiet).await,
        // No subcommand provided, just show the banner
        _ => return,
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
