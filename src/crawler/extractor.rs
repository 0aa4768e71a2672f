//! HTML extraction into structured page data
//!
//! This module turns a fetched HTML document into the data the analyzers
//! and the link/asset audits work from:
//! - Head metadata (title, description, canonical, robots, Open Graph)
//! - Heading outline and visible word count
//! - Links with anchor text, internal flag and nofollow
//! - Images, scripts and stylesheets
//! - JSON-LD structured-data blocks

use crate::url::{resolve_link, same_site};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors that make a document unusable for analysis
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Document is empty")]
    EmptyDocument,

    #[error("Document does not contain HTML markup")]
    NotHtml,
}

/// Converts raw HTML into structured page data
pub trait PageExtractor: Send + Sync {
    /// Extracts page data from `html`, resolving relative references against `page_url`
    fn extract(&self, html: &str, page_url: &Url) -> Result<ExtractedPage, ExtractionError>;
}

/// Everything extracted from one page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub metadata: PageMetadata,
    pub links: Vec<ExtractedLink>,
    pub images: Vec<ExtractedImage>,
    pub scripts: Vec<String>,
    pub stylesheets: Vec<String>,
    pub structured_data: Vec<StructuredDataBlock>,
}

/// Head metadata and document outline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub canonical: Option<String>,
    pub lang: Option<String>,
    pub meta_robots: Option<String>,
    pub h1: Vec<String>,
    pub headings: Vec<Heading>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub word_count: usize,
}

impl PageMetadata {
    /// True when the meta robots directive contains `noindex`
    pub fn is_noindex(&self) -> bool {
        self.meta_robots
            .as_deref()
            .map(|r| {
                r.split(',')
                    .any(|d| d.trim().eq_ignore_ascii_case("noindex") || d.trim().eq_ignore_ascii_case("none"))
            })
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// A link found on the page, resolved to an absolute URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedLink {
    pub href: String,
    pub anchor_text: String,
    pub is_internal: bool,
    pub nofollow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedImage {
    pub src: String,
    /// None when the attribute is absent; Some("") for decorative images
    pub alt: Option<String>,
}

/// One `<script type="application/ld+json">` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredDataBlock {
    /// `@type` values found at the top level or in `@graph`
    pub types: Vec<String>,
    pub valid: bool,
    pub error: Option<String>,
}

/// scraper-backed extractor
#[derive(Debug, Clone, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PageExtractor for HtmlExtractor {
    /// # Link Extraction Rules
    ///
    /// **Include:**
    /// - `<a href="...">` anywhere in the document, deduplicated by absolute URL
    ///
    /// **Exclude:**
    /// - `<a href="..." download>`
    /// - `javascript:`, `mailto:`, `tel:` links
    /// - Data URIs and fragment-only links
    ///
    /// `rel="nofollow"` links are kept and flagged.
    fn extract(&self, html: &str, page_url: &Url) -> Result<ExtractedPage, ExtractionError> {
        if html.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }
        if !html.contains('<') {
            return Err(ExtractionError::NotHtml);
        }

        let document = Html::parse_document(html);

        Ok(ExtractedPage {
            metadata: extract_metadata(&document, page_url),
            links: extract_links(&document, page_url),
            images: extract_images(&document, page_url),
            scripts: extract_attr_urls(&document, "script[src]", "src", page_url),
            stylesheets: extract_attr_urls(&document, "link[rel~='stylesheet'][href]", "href", page_url),
            structured_data: extract_structured_data(&document),
        })
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Collapses runs of whitespace in an element's text
fn element_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .filter_map(|e| e.value().attr(attr))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Finds `<meta name=...>` or `<meta property=...>` content, case-insensitively
fn meta_content(document: &Html, key_attr: &str, key: &str) -> Option<String> {
    let sel = selector("meta[content]")?;
    document
        .select(&sel)
        .filter(|e| {
            e.value()
                .attr(key_attr)
                .map(|v| v.trim().eq_ignore_ascii_case(key))
                .unwrap_or(false)
        })
        .filter_map(|e| e.value().attr("content"))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn extract_metadata(document: &Html, page_url: &Url) -> PageMetadata {
    let canonical = selector("link[rel][href]").and_then(|sel| {
        document
            .select(&sel)
            .filter(|e| {
                e.value()
                    .attr("rel")
                    .map(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("canonical")))
                    .unwrap_or(false)
            })
            .filter_map(|e| e.value().attr("href"))
            .find_map(|href| page_url.join(href.trim()).ok())
            .map(|u| u.to_string())
    });

    let headings: Vec<Heading> = selector("h1, h2, h3, h4, h5, h6")
        .map(|sel| {
            document
                .select(&sel)
                .filter_map(|e| {
                    let level = e.value().name().strip_prefix('h')?.parse::<u8>().ok()?;
                    Some(Heading {
                        level,
                        text: element_text(e),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let h1 = headings
        .iter()
        .filter(|h| h.level == 1)
        .map(|h| h.text.clone())
        .collect();

    PageMetadata {
        title: first_text(document, "title"),
        meta_description: meta_content(document, "name", "description"),
        canonical,
        lang: first_attr(document, "html[lang]", "lang"),
        meta_robots: meta_content(document, "name", "robots"),
        h1,
        headings,
        og_title: meta_content(document, "property", "og:title"),
        og_description: meta_content(document, "property", "og:description"),
        og_image: meta_content(document, "property", "og:image"),
        word_count: count_visible_words(document),
    }
}

/// Counts words in body text, ignoring script, style and noscript content
fn count_visible_words(document: &Html) -> usize {
    let Some(body_sel) = selector("body") else {
        return 0;
    };
    let Some(body) = document.select(&body_sel).next() else {
        return 0;
    };

    body.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent()?;
            let parent_name = parent.value().as_element().map(|e| e.name()).unwrap_or("");
            match parent_name {
                "script" | "style" | "noscript" | "template" => None,
                _ => Some(text.split_whitespace().count()),
            }
        })
        .sum()
}

fn extract_links(document: &Html, page_url: &Url) -> Vec<ExtractedLink> {
    let mut links: Vec<ExtractedLink> = Vec::new();
    let Some(a_selector) = selector("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(mut absolute) = resolve_link(href, page_url) else {
            continue;
        };
        absolute.set_fragment(None);
        let absolute_str = absolute.to_string();

        if links.iter().any(|l| l.href == absolute_str) {
            continue;
        }

        let nofollow = element
            .value()
            .attr("rel")
            .map(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("nofollow")))
            .unwrap_or(false);

        links.push(ExtractedLink {
            is_internal: same_site(page_url, &absolute),
            href: absolute_str,
            anchor_text: element_text(element),
            nofollow,
        });
    }

    links
}

fn extract_images(document: &Html, page_url: &Url) -> Vec<ExtractedImage> {
    let Some(sel) = selector("img[src]") else {
        return Vec::new();
    };

    document
        .select(&sel)
        .filter_map(|e| {
            let src = e.value().attr("src")?.trim();
            if src.is_empty() {
                return None;
            }
            // Inline data images are kept as-is
            let src = if src.starts_with("data:") {
                src.to_string()
            } else {
                page_url.join(src).ok()?.to_string()
            };
            Some(ExtractedImage {
                src,
                alt: e.value().attr("alt").map(|a| a.trim().to_string()),
            })
        })
        .collect()
}

fn extract_attr_urls(document: &Html, css: &str, attr: &str, page_url: &Url) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };

    let mut urls: Vec<String> = Vec::new();
    for url in document
        .select(&sel)
        .filter_map(|e| e.value().attr(attr))
        .filter_map(|v| page_url.join(v.trim()).ok())
        .map(|u| u.to_string())
    {
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

fn extract_structured_data(document: &Html) -> Vec<StructuredDataBlock> {
    let Some(sel) = selector("script[type]") else {
        return Vec::new();
    };

    document
        .select(&sel)
        .filter(|e| {
            e.value()
                .attr("type")
                .map(|t| t.trim().eq_ignore_ascii_case("application/ld+json"))
                .unwrap_or(false)
        })
        .map(|e| parse_json_ld(&e.text().collect::<String>()))
        .collect()
}

fn parse_json_ld(raw: &str) -> StructuredDataBlock {
    match serde_json::from_str::<serde_json::Value>(raw.trim()) {
        Ok(value) => {
            let mut types = Vec::new();
            collect_types(&value, &mut types);
            StructuredDataBlock {
                types,
                valid: true,
                error: None,
            }
        }
        Err(e) => StructuredDataBlock {
            types: Vec::new(),
            valid: false,
            error: Some(e.to_string()),
        },
    }
}

/// Collects `@type` values from a JSON-LD value, descending into arrays and `@graph`
fn collect_types(value: &serde_json::Value, types: &mut Vec<String>) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_types(item, types);
            }
        }
        serde_json::Value::Object(map) => {
            match map.get("@type") {
                Some(serde_json::Value::String(t)) => types.push(t.clone()),
                Some(serde_json::Value::Array(ts)) => {
                    types.extend(ts.iter().filter_map(|t| t.as_str().map(str::to_string)))
                }
                _ => {}
            }
            if let Some(graph) = map.get("@graph") {
                collect_types(graph, types);
            }
        }
        _ => {}
    }
}
