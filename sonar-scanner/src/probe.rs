use crate::error::{Result, ScanError};
use crate::fingerprint::fingerprint;
use crate::ports::PortScanner;
use crate::report::render_report;
use crate::result::{Priority, Tag, TargetResult};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::{Client, Request, Response};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Link keywords worth flagging when analysing a single URL
const SENSITIVE_LINK_KEYWORDS: &[&str] = &[
    "api", "admin", "login", "dashboard", "config", "token", "password", "jwt",
];

static API_KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)['"](api_key|secret_key|token)['"]\s*[:=]\s*['"]([a-zA-Z0-9\-_]{20,})['"]"#)
        .expect("api key pattern is a valid regex")
});

/// What kind of string a target is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// A bare host name, probed over https then http
    #[default]
    Subdomain,
    /// A full URL, fetched as given
    Url,
}

impl TargetKind {
    pub fn label(self) -> &'static str {
        match self {
            TargetKind::Subdomain => "Subdomain",
            TargetKind::Url => "URL",
        }
    }
}

/// Per-target analysis switches
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeOptions {
    pub kind: TargetKind,
    pub deep_crawl: bool,
    pub port_scan: bool,
}

/// Analyse one target.
///
/// Implementations never fail: network errors, timeouts and unparseable
/// responses are reported as an unreachable [`TargetResult`].
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, target: &str, options: ProbeOptions) -> TargetResult;
}

#[derive(Debug, Clone)]
pub struct ProberSettings {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for ProberSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: format!("Sonar/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
        }
    }
}

/// Everything gathered from a parsed HTML page
#[derive(Debug, Default)]
struct PageAnalysis {
    technologies: Vec<String>,
    endpoints: Vec<String>,
}

/// The [`Probe`] that talks HTTP to real hosts
pub struct HttpProber {
    client: Client,
    settings: ProberSettings,
    ports: PortScanner,
}

impl HttpProber {
    pub fn new() -> Result<Self> {
        Self::with_settings(ProberSettings::default())
    }

    pub fn with_settings(settings: ProberSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout / 2)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .build()
            .map_err(|e| ScanError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            settings,
            ports: PortScanner::new(),
        })
    }

    pub fn with_port_scanner(mut self, ports: PortScanner) -> Self {
        self.ports = ports;
        self
    }

    /// Try https first, then plain http.
    async fn probe_subdomain(&self, subdomain: &str, options: ProbeOptions) -> TargetResult {
        let mut result = TargetResult::new(subdomain);
        let mut last_error = String::from("no request was sent");
        let mut response = None;

        for scheme in ["https", "http"] {
            let url = format!("{}://{}", scheme, subdomain);
            match self.send(&url, &mut result).await {
                Ok(resp) => {
                    response = Some(resp);
                    break;
                }
                Err(e) => {
                    debug!("{} failed: {}", url, e);
                    last_error = e.to_string();
                }
            }
        }

        let Some(response) = response else {
            return self.unreachable(result, options, &last_error);
        };

        result.reachable = true;
        result.status_code = response.status().as_u16();
        result.content_length = response.content_length();
        result.priority = Priority::for_subdomain(subdomain);

        if !options.deep_crawl && !options.port_scan {
            result.report = render_report(&result, options.kind, false, false);
            return result;
        }

        let (final_url, headers, body) = self.read_response(response, &mut result).await;

        if options.deep_crawl {
            result.headers = format_headers(&headers);
            let page = analyze_page(&headers, &body, &final_url);
            result.tags.extend(page.technologies.iter().map(|t| Tag::tech(t)));
            result.technologies = page.technologies;
            result.endpoints = page.endpoints;
        }

        if options.port_scan {
            self.scan_ports(subdomain, &mut result).await;
        }

        result.report = render_report(&result, options.kind, options.deep_crawl, options.port_scan);
        result
    }

    /// Fetch the URL as given and look for sensitive content.
    async fn probe_url(&self, target: &str, options: ProbeOptions) -> TargetResult {
        let mut result = TargetResult::new(target);

        let response = match self.send(target, &mut result).await {
            Ok(response) => response,
            Err(e) => {
                debug!("{} failed: {}", target, e);
                return self.unreachable(result, options, &e.to_string());
            }
        };

        result.reachable = true;
        result.status_code = response.status().as_u16();
        result.content_length = response.content_length();

        let (final_url, headers, body) = self.read_response(response, &mut result).await;
        result.headers = format_headers(&headers);
        result.findings = url_findings(&headers, &body, &final_url);
        result.priority = Priority::for_findings(&result.findings);

        if options.deep_crawl {
            let page = analyze_page(&headers, &body, &final_url);
            result.tags.extend(page.technologies.iter().map(|t| Tag::tech(t)));
            result.technologies = page.technologies;
            result.endpoints = page.endpoints;
        }

        if options.port_scan
            && let Some(host) = final_url.host_str()
        {
            let host = host.to_string();
            self.scan_ports(&host, &mut result).await;
        }

        result.report = render_report(&result, options.kind, options.deep_crawl, options.port_scan);
        result
    }

    /// Build, record and send a GET request.
    async fn send(&self, url: &str, result: &mut TargetResult) -> Result<Response> {
        let request = self
            .client
            .get(url)
            .build()
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;
        result.request_dump = dump_request(&request, &self.settings.user_agent);
        Ok(self.client.execute(request).await?)
    }

    async fn read_response(
        &self,
        response: Response,
        result: &mut TargetResult,
    ) -> (Url, HeaderMap, String) {
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let status_line = format!("{:?} {}", response.version(), response.status());

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Failed to read body of {}: {}", final_url, e);
                String::new()
            }
        };

        result.response_dump = dump_response(&status_line, &headers, &body);
        (final_url, headers, body)
    }

    async fn scan_ports(&self, target: &str, result: &mut TargetResult) {
        let host = host_of(target);
        for port in self.ports.scan(&host).await {
            result.tags.push(Tag::port(port));
        }
    }

    fn unreachable(&self, mut result: TargetResult, options: ProbeOptions, reason: &str) -> TargetResult {
        result.reachable = false;
        result.priority = Priority::Low;
        result.report = render_report(&result, options.kind, options.deep_crawl, options.port_scan);
        let _ = writeln!(result.report, "Error: {}", reason);
        result
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn probe(&self, target: &str, options: ProbeOptions) -> TargetResult {
        match options.kind {
            TargetKind::Subdomain => self.probe_subdomain(target, options).await,
            TargetKind::Url => self.probe_url(target, options).await,
        }
    }
}

/// Strip any port or path from a subdomain-ish target.
fn host_of(target: &str) -> String {
    let candidate = if target.contains("://") {
        target.to_string()
    } else {
        format!("http://{}", target)
    };

    Url::parse(&candidate)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| target.to_string())
}

fn format_headers(headers: &HeaderMap) -> String {
    let mut text = String::new();
    for (name, value) in headers {
        let _ = writeln!(text, "{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    text
}

fn dump_request(request: &Request, user_agent: &str) -> String {
    let url = request.url();
    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }

    let mut dump = format!("{} {} HTTP/1.1\r\n", request.method(), path);
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => {
                let _ = write!(dump, "Host: {}:{}\r\n", host, port);
            }
            None => {
                let _ = write!(dump, "Host: {}\r\n", host);
            }
        }
    }
    let _ = write!(dump, "User-Agent: {}\r\n", user_agent);
    for (name, value) in request.headers() {
        let _ = write!(dump, "{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes()));
    }
    dump.push_str("\r\n");
    dump
}

fn dump_response(status_line: &str, headers: &HeaderMap, body: &str) -> String {
    let mut dump = format!("{}\r\n", status_line);
    for (name, value) in headers {
        let _ = write!(dump, "{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes()));
    }
    dump.push_str("\r\n");
    dump.push_str(body);
    dump
}

/// Resolve a link against the page it was found on.
///
/// Anchors and non-navigable schemes yield `None`.
fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    let lower = href.to_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("mailto:")
        || lower.starts_with("javascript:")
        || lower.starts_with("tel:")
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// Links and script sources on the page, `href` winning over `src`
fn page_links(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href], script[src]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            element
                .value()
                .attr("href")
                .or_else(|| element.value().attr("src"))
                .map(|s| s.to_string())
        })
        .collect()
}

fn analyze_page(headers: &HeaderMap, body: &str, base: &Url) -> PageAnalysis {
    let document = Html::parse_document(body);

    let endpoints: BTreeSet<String> = page_links(&document)
        .iter()
        .filter_map(|link| resolve_link(base, link))
        .collect();

    PageAnalysis {
        technologies: fingerprint(headers, body, &document),
        endpoints: endpoints.into_iter().collect(),
    }
}

fn url_findings(headers: &HeaderMap, body: &str, base: &Url) -> Vec<String> {
    let mut findings = BTreeSet::new();

    if let Some(server) = headers.get("server").and_then(|v| v.to_str().ok()) {
        findings.insert(format!("Header - Server: {}", server));
    }

    let document = Html::parse_document(body);
    for link in page_links(&document) {
        if let Some(absolute) = resolve_link(base, &link) {
            let lower = absolute.to_lowercase();
            if SENSITIVE_LINK_KEYWORDS.iter().any(|k| lower.contains(k)) {
                findings.insert(format!("Sensitive Link: {}", absolute));
            }
        }
    }

    let login_form = ["form[action*='login']", "input[type='password']"]
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .any(|selector| document.select(&selector).next().is_some());
    if login_form {
        findings.insert("Functionality: Login form detected".to_string());
    }

    if API_KEY_PATTERN.is_match(body) {
        findings.insert("HIGH: Potential API key found in response body".to_string());
    }

    findings.into_iter().collect()
}
