//! Writing finished job results to disk.

use crate::error::Result;
use sonar_scanner::{TargetKind, TargetResult};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const UTF8_BOM: &str = "\u{FEFF}";

/// Reachable targets, one per line, in result order
pub fn reachable_listing(results: &[TargetResult]) -> String {
    results
        .iter()
        .filter(|result| result.reachable)
        .map(|result| result.target.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`
pub fn sanitize_file_name(target: &str) -> String {
    target
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn kind_slug(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Subdomain => "subdomains",
        TargetKind::Url => "urls",
    }
}

/// Write the reachable listing and, with `include_reports`, one report file
/// per reachable target into `dir`. Returns the paths written.
///
/// Layout: `reachable_<kind>.txt` and `<kind>_reports/<target>.txt`. A target
/// listed more than once gets `<target>_2.txt`, `<target>_3.txt` and so on.
pub fn write_export(
    dir: &Path,
    kind: TargetKind,
    results: &[TargetResult],
    include_reports: bool,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let slug = kind_slug(kind);
    let mut written = Vec::new();

    let listing = dir.join(format!("reachable_{}.txt", slug));
    fs::write(&listing, reachable_listing(results))?;
    written.push(listing);

    if include_reports {
        let reports_dir = dir.join(format!("{}_reports", slug));
        fs::create_dir_all(&reports_dir)?;

        let mut used = HashSet::new();
        for result in results.iter().filter(|result| result.reachable) {
            let stem = sanitize_file_name(&result.target);
            let mut file_name = format!("{}.txt", stem);
            let mut suffix = 1;
            while !used.insert(file_name.clone()) {
                suffix += 1;
                file_name = format!("{}_{}.txt", stem, suffix);
            }

            let path = reports_dir.join(file_name);
            fs::write(&path, format!("{}{}", UTF8_BOM, result.report))?;
            written.push(path);
        }
    }

    info!(dir = %dir.display(), files = written.len(), "Exported results");
    Ok(written)
}
