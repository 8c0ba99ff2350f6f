//! HTML extraction for audit page records
//!
//! Pulls the SEO-relevant structure out of a fetched page: title, meta
//! description, headings, classified links, image alt coverage,
//! canonical URL, and mixed-content resources. All relative URLs are
//! resolved against the page's own URL.

use crate::storage::PageLink;
use scraper::{Html, Selector};
use url::Url;

/// Structured content extracted from one HTML document
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub h1s: Vec<String>,
    pub internal_links: Vec<PageLink>,
    pub external_links: Vec<PageLink>,
    pub images_total: u32,
    pub images_missing_alt: u32,
    pub canonical_url: Option<String>,
    pub mixed_content_urls: Vec<String>,
}

/// Parses an HTML document and extracts its audit-relevant content
///
/// scraper's parser is lenient; malformed markup degrades to whatever
/// structure can be recovered rather than failing.
pub fn extract_content(html: &str, page_url: &Url) -> ExtractedContent {
    let document = Html::parse_document(html);
    let mut content = ExtractedContent::default();

    content.title = extract_first_text(&document, "title");
    content.meta_description = extract_meta_description(&document);
    content.h1s = extract_h1s(&document);
    extract_links(&document, page_url, &mut content);
    extract_images(&document, &mut content);
    content.canonical_url = extract_canonical(&document, page_url);

    if page_url.scheme() == "https" {
        content.mixed_content_urls = extract_mixed_content(&document, page_url);
    }

    content
}

fn extract_first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_meta_description(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name='description']").ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_h1s(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("h1") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .collect()
}

fn extract_links(document: &Html, page_url: &Url, content: &mut ExtractedContent) {
    let Ok(selector) = Selector::parse("a[href]") else {
        return;
    };

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve_href(href, page_url) else {
            continue;
        };

        let anchor_text = element.text().collect::<String>().trim().to_string();
        let link = PageLink {
            url: resolved.as_str().to_string(),
            anchor_text,
        };

        if resolved.host_str() == page_url.host_str() {
            content.internal_links.push(link);
        } else {
            content.external_links.push(link);
        }
    }
}

fn extract_images(document: &Html, content: &mut ExtractedContent) {
    let Ok(selector) = Selector::parse("img") else {
        return;
    };

    for element in document.select(&selector) {
        content.images_total += 1;
        let alt = element.value().attr("alt");
        if alt.map(|a| a.trim().is_empty()).unwrap_or(true) {
            content.images_missing_alt += 1;
        }
    }
}

fn extract_canonical(document: &Html, page_url: &Url) -> Option<String> {
    let selector = Selector::parse("link[rel='canonical'][href]").ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .map(|url| url.as_str().to_string())
}

/// Collects `http://` sub-resources referenced from an HTTPS page
fn extract_mixed_content(document: &Html, page_url: &Url) -> Vec<String> {
    let mut resources = Vec::new();

    let selectors = [
        ("img[src]", "src"),
        ("script[src]", "src"),
        ("link[rel='stylesheet'][href]", "href"),
    ];

    for (selector_str, attr) in selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            let Some(value) = element.value().attr(attr) else {
                continue;
            };
            if let Ok(resolved) = page_url.join(value.trim()) {
                if resolved.scheme() == "http" {
                    resources.push(resolved.as_str().to_string());
                }
            }
        }
    }

    resources
}

/// Resolves an anchor href to an absolute URL, filtering out
/// non-crawlable schemes
///
/// Returns None for javascript:, mailto:, tel:, data: links,
/// fragment-only anchors, and anything that does not resolve to
/// http(s).
fn resolve_href(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    // Same-page anchors
    if href.starts_with('#') {
        return None;
    }

    let resolved = page_url.join(href).ok()?;
    if resolved.scheme() == "http" || resolved.scheme() == "https" {
        Some(resolved)
    } else {
        None
    }
}
