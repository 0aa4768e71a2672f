use url::Url;

/// Returns the host used to decide whether two URLs belong to the same site
///
/// The host is lowercased and a leading `www.` is dropped, so the apex and
/// `www` variants of a site compare equal.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_audit::url::site_host;
///
/// let url = Url::parse("https://WWW.Example.com/path").unwrap();
/// assert_eq!(site_host(&url), Some("example.com".to_string()));
/// ```
pub fn site_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(rest) => rest.to_string(),
            None => host,
        }
    })
}

/// Checks whether `candidate` is on the same site as `root`
///
/// One audit run covers exactly one site: same site host and same port.
pub fn same_site(root: &Url, candidate: &Url) -> bool {
    match (site_host(root), site_host(candidate)) {
        (Some(a), Some(b)) => a == b && root.port_or_known_default() == candidate.port_or_known_default(),
        _ => false,
    }
}
