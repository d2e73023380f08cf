//! Filename hint from the URL path.

/// Last non-empty path segment of `url`, percent-decoding left as-is.
///
/// `None` if the URL does not parse or has no usable segment.
pub fn url_filename(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?;
    match segment {
        "." | ".." => None,
        s => Some(s.to_string()),
    }
}
