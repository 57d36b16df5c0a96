// Human-readable per-target reports

use crate::probe::TargetKind;
use crate::result::TargetResult;
use std::fmt::Write;

/// Render the plain-text report for a single probed target.
///
/// Sections only appear when the corresponding analysis ran: technologies,
/// endpoints, headers and the raw request/response dumps need a deep crawl,
/// open ports need a port scan. Unreachable targets only get the summary lines.
pub fn render_report(
    result: &TargetResult,
    kind: TargetKind,
    deep_crawl: bool,
    port_scan: bool,
) -> String {
    let mut report = String::new();
    let _ = writeln!(report, "{}: {}", kind.label(), result.target);
    let _ = writeln!(report, "Reachable: {}", result.reachable);
    let _ = writeln!(report, "Priority: {}", result.priority);

    if !result.reachable {
        return report;
    }

    let _ = writeln!(report, "Status: {}", result.status_code);
    match result.content_length {
        Some(length) => {
            let _ = writeln!(report, "Content-Length: {}", length);
        }
        None => report.push_str("Content-Length: unknown\n"),
    }

    if !result.findings.is_empty() {
        report.push_str("\nFindings:\n");
        for finding in &result.findings {
            let _ = writeln!(report, "- {}", finding);
        }
    }

    if deep_crawl {
        if !result.technologies.is_empty() {
            report.push_str("\nTechnologies Detected:\n");
            for tech in &result.technologies {
                let _ = writeln!(report, "- {}", tech);
            }
        }
        if !result.endpoints.is_empty() {
            report.push_str("\nDiscovered Endpoints:\n");
            for endpoint in &result.endpoints {
                let _ = writeln!(report, "- {}", endpoint);
            }
        }
        if !result.headers.is_empty() {
            report.push_str("\nHeaders:\n");
            report.push_str(&result.headers);
        }
    }

    if port_scan {
        let ports = result.open_ports();
        if !ports.is_empty() {
            let _ = writeln!(report, "\nOpen Ports:\n{}", ports.join(", "));
        }
    }

    if deep_crawl && !result.request_dump.is_empty() {
        report.push_str("\n--- Request ---\n");
        report.push_str(&result.request_dump);
        report.push_str("\n--- Full Response ---\n");
        report.push_str(&result.response_dump);
    }

    report
}
