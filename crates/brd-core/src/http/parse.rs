//! Parse the final response header block collected from curl.

/// Status and the headers the packer reads from a GET response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u32,
    /// Declared body size, if `Content-Length` was sent.
    pub content_length: Option<u64>,
    /// Raw `Content-Disposition` value, if sent.
    pub content_disposition: Option<String>,
}

/// Parse header lines of the last response (redirect hops before it are skipped).
pub(crate) fn parse_head(lines: &[String]) -> ResponseHead {
    let start = lines
        .iter()
        .rposition(|l| l.starts_with("HTTP/"))
        .unwrap_or(0);

    let mut head = ResponseHead::default();
    for line in &lines[start..] {
        let line = line.trim();
        if line.starts_with("HTTP/") {
            head.status = line
                .split_whitespace()
                .nth(1)
                .and_then(|code| code.parse().ok())
                .unwrap_or(0);
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            head.content_length = value.parse().ok();
        } else if name.eq_ignore_ascii_case("content-disposition") {
            head.content_disposition = Some(value.to_string());
        }
    }
    head
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn status_length_disposition() {
        let head = parse_head(&lines(&[
            "HTTP/1.1 200 OK",
            "Content-Length: 12345",
            "Content-Disposition: attachment; filename=\"cf.tgz\"",
            "",
        ]));
        assert_eq!(head.status, 200);
        assert_eq!(head.content_length, Some(12345));
        assert_eq!(
            head.content_disposition.as_deref(),
            Some("attachment; filename=\"cf.tgz\"")
        );
    }

    #[test]
    fn last_block_wins_after_redirect() {
        let head = parse_head(&lines(&[
            "HTTP/1.1 302 Found",
            "Location: https://cdn.example.com/cf.tgz",
            "Content-Length: 0",
            "",
            "HTTP/2 200",
            "content-length: 42",
            "",
        ]));
        assert_eq!(head.status, 200);
        assert_eq!(head.content_length, Some(42));
        assert!(head.content_disposition.is_none());
    }

    #[test]
    fn missing_length() {
        let head = parse_head(&lines(&["HTTP/1.1 404 Not Found", "Server: test"]));
        assert_eq!(head.status, 404);
        assert_eq!(head.content_length, None);
    }
}
