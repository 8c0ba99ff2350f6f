//! Robots.txt parsing and URL permission checks
//!
//! Only `User-agent: *` groups are honored. Path patterns support the
//! `*` wildcard and a trailing `$` end anchor; anything else is a
//! literal prefix match. An `Allow` match always beats a `Disallow`
//! match, which reproduces the permissive precedence this auditor has
//! always shipped with (longest-match would change which URLs enter
//! the crawl set).

use regex::Regex;
use url::Url;

/// Parsed robots.txt rules for one host
#[derive(Debug, Clone)]
pub struct RobotsRules {
    allow: Vec<Regex>,
    disallow: Vec<Regex>,
    sitemaps: Vec<String>,
}

impl RobotsRules {
    /// Creates a permissive rule set that allows everything
    ///
    /// Used whenever robots.txt is absent or unfetchable (fail open).
    pub fn allow_all() -> Self {
        Self {
            allow: Vec::new(),
            disallow: Vec::new(),
            sitemaps: Vec::new(),
        }
    }

    /// Parses robots.txt content
    ///
    /// Rule lines are collected from `User-agent: *` groups only.
    /// `Sitemap:` lines are host-wide declarations and are collected
    /// wherever they appear. Unparseable lines are skipped.
    pub fn parse(content: &str) -> Self {
        let mut rules = Self::allow_all();

        // Consecutive User-agent lines form one group header; the
        // group applies to us if any of them is "*".
        let mut group_is_wildcard = false;
        let mut in_group_header = false;

        for line in content.lines() {
            // Strip comments
            let line = match line.split_once('#') {
                Some((before, _)) => before,
                None => line,
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if !in_group_header {
                        group_is_wildcard = false;
                        in_group_header = true;
                    }
                    if value == "*" {
                        group_is_wildcard = true;
                    }
                }
                "allow" => {
                    in_group_header = false;
                    if group_is_wildcard && !value.is_empty() {
                        if let Some(re) = pattern_to_regex(value) {
                            rules.allow.push(re);
                        }
                    }
                }
                "disallow" => {
                    in_group_header = false;
                    // An empty Disallow value means "allow all"
                    if group_is_wildcard && !value.is_empty() {
                        if let Some(re) = pattern_to_regex(value) {
                            rules.disallow.push(re);
                        }
                    }
                }
                "sitemap" => {
                    in_group_header = false;
                    if !value.is_empty() {
                        rules.sitemaps.push(value.to_string());
                    }
                }
                _ => {
                    in_group_header = false;
                }
            }
        }

        rules
    }

    /// Checks whether a path (with query string, if any) may be crawled
    ///
    /// Any `Allow` match wins; otherwise any `Disallow` match denies;
    /// no match at all defaults to allow.
    pub fn is_allowed(&self, path: &str) -> bool {
        if self.allow.iter().any(|re| re.is_match(path)) {
            return true;
        }
        if self.disallow.iter().any(|re| re.is_match(path)) {
            return false;
        }
        true
    }

    /// Checks a full URL against the rules
    pub fn is_url_allowed(&self, url: &Url) -> bool {
        self.is_allowed(&match_target(url))
    }

    /// Sitemap URLs declared in robots.txt
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }
}

/// The portion of a URL that robots patterns match against
pub fn match_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Compiles a robots path pattern into an anchored regex
///
/// `*` becomes `.*`, a trailing `$` anchors the end, everything else
/// is escaped literally. The pattern is anchored at the path start.
fn pattern_to_regex(pattern: &str) -> Option<Regex> {
    let (body, anchored) = match pattern.strip_suffix('$') {
        Some(body) => (body, true),
        None => (pattern, false),
    };

    let mut expr = String::with_capacity(body.len() + 4);
    expr.push('^');
    for ch in body.chars() {
        if ch == '*' {
            expr.push_str(".*");
        } else {
            expr.push_str(&regex::escape(&ch.to_string()));
        }
    }
    if anchored {
        expr.push('$');
    }

    Regex::new(&expr).ok()
}
