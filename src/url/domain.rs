use url::Url;

/// Extracts the domain from a URL
///
/// The domain is the lowercase host followed by `:port` when the URL carries a
/// non-default port, so `a.test:8080` and `a.test` are different domains.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use focal_crawl::url::extract_domain;
///
/// let url = Url::parse("https://example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(extract_domain(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Returns `scheme://domain` for a URL, the base that root-relative hrefs and
/// `/robots.txt` are resolved against
pub fn base_url(url: &Url) -> Option<String> {
    extract_domain(url).map(|domain| format!("{}://{}", url.scheme(), domain))
}
