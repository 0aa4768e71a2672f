//! Sitemap XML parsing
//!
//! A document is either a `<urlset>` (page URLs) or a `<sitemapindex>`
//! (child sitemap URLs). The reader streams both entry kinds, so one parse
//! handles either shape.

use sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::io::Cursor;

/// Entries of one sitemap document, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSitemap {
    /// `<url><loc>` entries
    pub urls: Vec<String>,

    /// `<sitemap><loc>` entries of a sitemap index
    pub children: Vec<String>,
}

impl ParsedSitemap {
    /// True for a sitemap index
    pub fn is_index(&self) -> bool {
        !self.children.is_empty()
    }

    /// True when the document held no usable entries
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.children.is_empty()
    }
}

/// Parses sitemap XML
///
/// Entries without a valid `<loc>` are skipped; malformed XML yields
/// whatever entries were read before the error.
pub fn parse_sitemap(xml: &str) -> ParsedSitemap {
    let mut parsed = ParsedSitemap::default();
    let reader = SiteMapReader::new(Cursor::new(xml.as_bytes()));

    for entity in reader {
        match entity {
            SiteMapEntity::Url(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    parsed.urls.push(url.to_string());
                }
            }
            SiteMapEntity::SiteMap(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    parsed.children.push(url.to_string());
                }
            }
            SiteMapEntity::Err(e) => {
                tracing::debug!("Skipping malformed sitemap entry: {:?}", e);
            }
        }
    }

    parsed
}
