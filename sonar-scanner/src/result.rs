use serde::{Deserialize, Serialize};
use std::fmt;

/// Keywords that mark a subdomain as an obvious high-value surface
const HIGH_PRIORITY_KEYWORDS: &[&str] = &[
    "admin", "login", "portal", "dashboard", "api", "payment", "vpn", "remote", "cpanel", "ssh",
];

/// Keywords that usually point at pre-production or tooling hosts
const MEDIUM_PRIORITY_KEYWORDS: &[&str] = &[
    "dev", "staging", "test", "uat", "demo", "git", "jira", "ci", "cd",
];

/// Urgency classification of a probed target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    High,
    Medium,
    #[default]
    Low,
}

impl Priority {
    /// Sort rank, lower sorts first
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Classify a subdomain by the keywords it contains.
    pub fn for_subdomain(subdomain: &str) -> Self {
        if contains_any(subdomain, HIGH_PRIORITY_KEYWORDS) {
            Priority::High
        } else if contains_any(subdomain, MEDIUM_PRIORITY_KEYWORDS) {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    /// Classify a URL from the findings its content produced.
    pub fn for_findings(findings: &[String]) -> Self {
        let has = |needle: &str| findings.iter().any(|f| f.contains(needle));

        if has("HIGH:") {
            Priority::High
        } else if has("Sensitive Link") || has("Login form") {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Tech,
    Port,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TagKind,
}

impl Tag {
    pub fn tech(name: &str) -> Self {
        Self {
            name: format!("Tech: {}", name),
            kind: TagKind::Tech,
        }
    }

    pub fn port(port: u16) -> Self {
        Self {
            name: format!("Port: {}", port),
            kind: TagKind::Port,
        }
    }
}

/// Outcome of probing a single target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetResult {
    pub target: String,
    pub reachable: bool,
    pub status_code: u16,
    pub content_length: Option<u64>,
    pub priority: Priority,
    pub tags: Vec<Tag>,
    pub endpoints: Vec<String>,
    pub headers: String,
    pub technologies: Vec<String>,
    pub findings: Vec<String>,
    pub report: String,
    /// Raw request dump, only ever rendered into the report
    #[serde(skip)]
    pub request_dump: String,
    /// Raw response dump, only ever rendered into the report
    #[serde(skip)]
    pub response_dump: String,
}

impl TargetResult {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    /// An unreachable result whose report explains why.
    pub fn unreachable(target: impl Into<String>, reason: &str) -> Self {
        let mut result = Self::new(target);
        result.report = format!(
            "Target: {}\nReachable: false\nPriority: {}\nError: {}\n",
            result.target, result.priority, reason
        );
        result
    }

    /// Open ports recorded as tags, in tag order
    pub fn open_ports(&self) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|tag| tag.kind == TagKind::Port)
            .map(|tag| tag.name.trim_start_matches("Port: "))
            .collect()
    }
}
