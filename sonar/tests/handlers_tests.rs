use sonar::handlers::*;
use sonar::command_argument_builder;
use sonar_core::PauseState;
use sonar_scanner::{Priority, Tag, TargetKind, TargetResult};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn scan_matches(args: &[&str]) -> clap::ArgMatches {
    let matches = command_argument_builder()
        .try_get_matches_from(args.iter().copied())
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();
    sub.clone()
}

#[test]
fn test_load_targets_explicit_only() {
    let targets = vec!["a.example.com".to_string(), "b.example.com".to_string()];
    let result = load_targets_from_source(&targets, None).unwrap();

    assert_eq!(result, vec!["a.example.com", "b.example.com"]);
}

#[test]
fn test_load_targets_from_file_after_explicit() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "api.example.com")?;
    writeln!(temp_file)?; // Empty line
    writeln!(temp_file, "  dev.example.com  ")?;

    let path = PathBuf::from(temp_file.path());
    let explicit = vec!["www.example.com".to_string()];
    let targets = load_targets_from_source(&explicit, Some(&path))?;

    assert_eq!(
        targets,
        vec!["www.example.com", "api.example.com", "dev.example.com"]
    );
    Ok(())
}

#[test]
fn test_load_targets_no_input() {
    let result = load_targets_from_source(&[], None);
    assert!(result.is_err());
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("Either --target or --hosts-file")
    );
}

#[test]
fn test_load_targets_blank_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "   ").unwrap();

    let path = PathBuf::from(temp_file.path());
    let result = load_targets_from_source(&[], Some(&path));

    assert!(result.unwrap_err().to_string().contains("No targets found"));
}

#[test]
fn test_job_config_defaults() {
    let sub = scan_matches(&["sonar", "subdomains", "-t", "a.example.com"]);
    let config = job_config_from_matches(TargetKind::Subdomain, &sub);

    assert_eq!(config.kind, TargetKind::Subdomain);
    assert!(!config.deep_crawl);
    assert!(!config.port_scan);
    assert_eq!(config.capacity(), 10);
    assert_eq!(config.ai_provider, "openai");
}

#[test]
fn test_job_config_from_flags() {
    let sub = scan_matches(&[
        "sonar",
        "urls",
        "-t",
        "https://example.com",
        "-t",
        "https://example.org",
        "--deep-crawl",
        "--port-scan",
        "-r",
        "3",
        "--ai-provider",
        "deepseek",
        "--api-key",
        "k-123",
    ]);
    let config = job_config_from_matches(TargetKind::Url, &sub);

    assert_eq!(config.kind, TargetKind::Url);
    assert!(config.deep_crawl);
    assert!(config.port_scan);
    assert_eq!(config.capacity(), 3);
    assert_eq!(config.ai_provider, "deepseek");
    assert_eq!(config.api_key, "k-123");
    assert_eq!(sub.get_many::<String>("target").unwrap().count(), 2);
}

#[test]
fn test_unknown_ai_provider_is_rejected() {
    let result = command_argument_builder().try_get_matches_from([
        "sonar",
        "subdomains",
        "-t",
        "a.example.com",
        "--ai-provider",
        "skynet",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_parse_pause_command() {
    assert_eq!(parse_pause_command("pause"), Some(PauseState::Paused));
    assert_eq!(parse_pause_command("  RESUME \n"), Some(PauseState::Running));
    assert_eq!(parse_pause_command("paused"), Some(PauseState::Paused));
    assert_eq!(parse_pause_command("stop"), None);
    assert_eq!(parse_pause_command(""), None);
}

#[test]
fn test_output_dir_expands_tilde() {
    assert_eq!(output_dir("/tmp/sonar-out"), PathBuf::from("/tmp/sonar-out"));
    assert!(output_dir("~/sonar-out").ends_with("sonar-out"));
}

#[test]
fn test_format_result_line() {
    colored::control::set_override(false);

    let unreachable = TargetResult::unreachable("down.example.com", "timeout");
    assert_eq!(format_result_line(&unreachable), "  ✗ down.example.com");

    let mut reachable = TargetResult::new("admin.example.com");
    reachable.reachable = true;
    reachable.status_code = 200;
    reachable.priority = Priority::High;
    reachable.technologies = vec!["Nginx".to_string()];
    reachable.tags = vec![Tag::tech("Nginx"), Tag::port(443)];
    reachable.findings = vec!["Header - Server: nginx".to_string()];

    let line = format_result_line(&reachable);
    assert!(line.starts_with("  ✓ [High] admin.example.com (200)"));
    assert!(line.contains("Nginx"));
    assert!(line.contains("ports: 443"));
    assert!(line.contains("• Header - Server: nginx"));
}
