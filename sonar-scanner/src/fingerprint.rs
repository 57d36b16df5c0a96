// Passive technology fingerprinting from response headers and HTML

use reqwest::header::HeaderMap;
use scraper::{Html, Selector};
use std::collections::BTreeSet;

/// Where a signature looks for its evidence
enum Signal {
    /// Header value contains the needle (case-insensitive)
    HeaderContains(&'static str, &'static str),
    /// Header is present at all
    HeaderPresent(&'static str),
    /// Body contains the needle (case-insensitive)
    BodyContains(&'static str),
}

struct Signature {
    name: &'static str,
    signals: &'static [Signal],
}

const SIGNATURES: &[Signature] = &[
    Signature {
        name: "Nginx",
        signals: &[Signal::HeaderContains("server", "nginx")],
    },
    Signature {
        name: "Apache",
        signals: &[Signal::HeaderContains("server", "apache")],
    },
    Signature {
        name: "Microsoft IIS",
        signals: &[Signal::HeaderContains("server", "microsoft-iis")],
    },
    Signature {
        name: "Cloudflare",
        signals: &[
            Signal::HeaderContains("server", "cloudflare"),
            Signal::HeaderPresent("cf-ray"),
        ],
    },
    Signature {
        name: "PHP",
        signals: &[
            Signal::HeaderContains("x-powered-by", "php"),
            Signal::HeaderContains("set-cookie", "phpsessid"),
        ],
    },
    Signature {
        name: "ASP.NET",
        signals: &[
            Signal::HeaderContains("x-powered-by", "asp.net"),
            Signal::HeaderPresent("x-aspnet-version"),
        ],
    },
    Signature {
        name: "Express",
        signals: &[Signal::HeaderContains("x-powered-by", "express")],
    },
    Signature {
        name: "Next.js",
        signals: &[
            Signal::HeaderContains("x-powered-by", "next.js"),
            Signal::BodyContains("__next_data__"),
        ],
    },
    Signature {
        name: "WordPress",
        signals: &[
            Signal::BodyContains("/wp-content/"),
            Signal::BodyContains("/wp-includes/"),
        ],
    },
    Signature {
        name: "Drupal",
        signals: &[
            Signal::HeaderContains("x-generator", "drupal"),
            Signal::BodyContains("drupal.settings"),
        ],
    },
    Signature {
        name: "jQuery",
        signals: &[Signal::BodyContains("jquery")],
    },
    Signature {
        name: "React",
        signals: &[
            Signal::BodyContains("data-reactroot"),
            Signal::BodyContains("react-dom"),
        ],
    },
    Signature {
        name: "Vue.js",
        signals: &[Signal::BodyContains("vue.js"), Signal::BodyContains("data-v-")],
    },
    Signature {
        name: "Angular",
        signals: &[Signal::BodyContains("ng-version")],
    },
    Signature {
        name: "Bootstrap",
        signals: &[Signal::BodyContains("bootstrap.min.css")],
    },
    Signature {
        name: "Google Analytics",
        signals: &[
            Signal::BodyContains("google-analytics.com"),
            Signal::BodyContains("googletagmanager.com/gtag"),
        ],
    },
    Signature {
        name: "Varnish",
        signals: &[
            Signal::HeaderPresent("x-varnish"),
            Signal::HeaderContains("via", "varnish"),
        ],
    },
    Signature {
        name: "Amazon CloudFront",
        signals: &[Signal::HeaderPresent("x-amz-cf-id")],
    },
];

/// Detect technologies from headers and the parsed document.
///
/// The returned names are sorted and unique. The content of any
/// `<meta name="generator">` tag is reported verbatim alongside the
/// signature matches.
pub fn fingerprint(headers: &HeaderMap, body: &str, document: &Html) -> Vec<String> {
    let body_lower = body.to_lowercase();
    let header_value = |name: &str| {
        headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(|v| v.to_lowercase())
            .collect::<Vec<_>>()
    };

    let mut found = BTreeSet::new();

    for signature in SIGNATURES {
        let matched = signature.signals.iter().any(|signal| match signal {
            Signal::HeaderContains(name, needle) => {
                header_value(name).iter().any(|v| v.contains(needle))
            }
            Signal::HeaderPresent(name) => headers.contains_key(*name),
            Signal::BodyContains(needle) => body_lower.contains(needle),
        });
        if matched {
            found.insert(signature.name.to_string());
        }
    }

    if let Ok(selector) = Selector::parse("meta[name=generator]") {
        for element in document.select(&selector) {
            if let Some(content) = element.value().attr("content") {
                let content = content.trim();
                if !content.is_empty() {
                    found.insert(content.to_string());
                }
            }
        }
    }

    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_header_signatures() {
        let map = headers(&[("server", "nginx/1.25.3"), ("x-powered-by", "PHP/8.2")]);
        let doc = Html::parse_document("<html></html>");

        let techs = fingerprint(&map, "", &doc);
        assert_eq!(techs, vec!["Nginx".to_string(), "PHP".to_string()]);
    }

    #[test]
    fn test_body_signatures_and_generator() {
        let body = r#"<html><head>
            <meta name="generator" content="WordPress 6.4.2">
            <script src="/wp-includes/js/jquery/jquery.min.js"></script>
        </head></html>"#;
        let doc = Html::parse_document(body);

        let techs = fingerprint(&HeaderMap::new(), body, &doc);
        assert!(techs.contains(&"WordPress".to_string()));
        assert!(techs.contains(&"jQuery".to_string()));
        assert!(techs.contains(&"WordPress 6.4.2".to_string()));
    }

    #[test]
    fn test_presence_only_header() {
        let map = headers(&[("cf-ray", "8a1b2c3d4e5f-AMS")]);
        let doc = Html::parse_document("");

        assert_eq!(fingerprint(&map, "", &doc), vec!["Cloudflare".to_string()]);
    }

    #[test]
    fn test_nothing_detected() {
        let doc = Html::parse_document("<html><body>plain</body></html>");
        assert!(fingerprint(&HeaderMap::new(), "<html><body>plain</body></html>", &doc).is_empty());
    }
}
