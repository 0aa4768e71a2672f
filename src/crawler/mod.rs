//! Crawler module for talking to the audited host
//!
//! This module contains the request-level plumbing, including:
//! - HTTP fetching with explicit timeouts and typed errors
//! - Crawl-delay spacing shared by every request to the host
//! - HTML extraction into structured page data

mod extractor;
mod fetcher;
mod throttle;

pub use extractor::{
    ExtractedImage, ExtractedLink, ExtractedPage, ExtractionError, Heading, HtmlExtractor,
    PageExtractor, PageMetadata, StructuredDataBlock,
};
pub use fetcher::{build_http_client, is_html_content_type, FetchError, FetchedPage, PageFetcher};
pub use throttle::{effective_delay, time_until_next_request, HostThrottle};
