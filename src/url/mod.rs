//! URL handling module for Site-Audit
//!
//! This module provides the normalization rule used to deduplicate discovered
//! pages, same-site checks, and resolution of relative links.

mod domain;
mod normalize;

use url::Url;

// Re-export main functions
pub use domain::{same_site, site_host};
pub use normalize::normalize_url;

/// Resolves an href found on a page to an absolute http(s) URL
///
/// Returns None for links that never point at a fetchable document:
/// `javascript:`, `mailto:`, `tel:` and `data:` hrefs, bare fragments,
/// and anything that fails to parse.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let resolved = base_url.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

/// Builds `{origin}{path}` for a root URL, e.g. `/robots.txt` or `/sitemap.xml`
pub fn origin_path(root: &Url, path: &str) -> Option<Url> {
    root.join(path).ok()
}
