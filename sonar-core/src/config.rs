use serde::{Deserialize, Serialize};
use sonar_scanner::{ProbeOptions, TargetKind};

/// Admission capacity used when a job does not set one
pub const DEFAULT_CAPACITY: usize = 10;

/// Per-job configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobConfig {
    pub kind: TargetKind,
    pub deep_crawl: bool,
    pub port_scan: bool,
    /// Maximum probes in flight at once; zero means [`DEFAULT_CAPACITY`].
    ///
    /// Despite the name this is an admission bound, not a timed rate.
    pub requests_per_second: usize,
    /// Passed through untouched to the summarizer
    pub ai_provider: String,
    /// Passed through untouched to the summarizer
    pub api_key: String,
}

impl JobConfig {
    pub fn new(kind: TargetKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn with_deep_crawl(mut self, deep_crawl: bool) -> Self {
        self.deep_crawl = deep_crawl;
        self
    }

    pub fn with_port_scan(mut self, port_scan: bool) -> Self {
        self.port_scan = port_scan;
        self
    }

    pub fn with_requests_per_second(mut self, requests_per_second: usize) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    pub fn with_ai(mut self, provider: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.ai_provider = provider.into();
        self.api_key = api_key.into();
        self
    }

    /// How many probes may run at the same time for this job
    pub fn capacity(&self) -> usize {
        if self.requests_per_second > 0 {
            self.requests_per_second
        } else {
            DEFAULT_CAPACITY
        }
    }

    pub fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            kind: self.kind,
            deep_crawl: self.deep_crawl,
            port_scan: self.port_scan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(JobConfig::default().capacity(), DEFAULT_CAPACITY);
        assert_eq!(
            JobConfig::default().with_requests_per_second(0).capacity(),
            DEFAULT_CAPACITY
        );
    }

    #[test]
    fn test_explicit_capacity() {
        assert_eq!(JobConfig::default().with_requests_per_second(3).capacity(), 3);
    }

    #[test]
    fn test_probe_options_follow_flags() {
        let options = JobConfig::new(TargetKind::Url)
            .with_deep_crawl(true)
            .with_port_scan(false)
            .probe_options();

        assert_eq!(options.kind, TargetKind::Url);
        assert!(options.deep_crawl);
        assert!(!options.port_scan);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: JobConfig =
            serde_json::from_str(r#"{"deepCrawl": true, "requestsPerSecond": 4}"#).unwrap();

        assert_eq!(config.kind, TargetKind::Subdomain);
        assert!(config.deep_crawl);
        assert!(!config.port_scan);
        assert_eq!(config.capacity(), 4);
        assert!(config.api_key.is_empty());
    }
}
