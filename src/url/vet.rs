//! Vetting of raw hrefs mined from a page
//!
//! Only two shapes of href are followed: absolute `http(s)` URLs and
//! root-relative paths. Anchors, asset files and document-relative paths are
//! dropped before any URL record is built.

/// Extensions of links that never lead to an HTML page worth crawling
pub const SKIPPED_EXTENSIONS: &[&str] = &[
    ".ogg", ".flv", ".swf", ".mp3", ".jpg", ".jpeg", ".gif", ".css", ".ico", ".rss", ".tiff",
    ".png", ".pdf",
];

/// Returns true if the href points at an asset by its extension
pub fn has_skipped_extension(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    SKIPPED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Turns a raw href into an absolute URL string, or `None` if it is not followed
///
/// # Arguments
///
/// * `base_url` - `scheme://domain` of the page the href was found on
/// * `href` - The raw attribute value
///
/// # Examples
///
/// ```
/// use focal_crawl::url::vet_href;
///
/// assert_eq!(vet_href("http://a.test", "/y"), Some("http://a.test/y".to_string()));
/// assert_eq!(vet_href("http://a.test", "#top"), None);
/// assert_eq!(vet_href("http://a.test", "not a url"), None);
/// ```
pub fn vet_href(base_url: &str, href: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') || has_skipped_extension(href) {
        return None;
    }

    if href.starts_with("//") {
        // Protocol-relative links are not followed
        return None;
    }

    if href.starts_with('/') && !href.contains(':') {
        return Some(format!("{}{}", base_url.trim_end_matches('/'), href));
    }

    if href.starts_with("http") {
        return Some(href.to_string());
    }

    None
}
