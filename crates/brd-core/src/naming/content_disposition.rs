//! `Content-Disposition` filename extraction.

/// Returns the filename carried by a `Content-Disposition` header value.
///
/// `filename*=UTF-8''...` (RFC 5987) wins over a plain `filename=`; quoted
/// plain values are unquoted and unescaped. Parameters other than these two
/// are ignored, as is the disposition type itself.
pub fn disposition_filename(header_value: &str) -> Option<String> {
    let mut plain: Option<String> = None;

    for (key, raw) in params(header_value) {
        if key.eq_ignore_ascii_case("filename*") {
            let encoded = raw
                .strip_prefix("UTF-8''")
                .or_else(|| raw.strip_prefix("utf-8''"));
            if let Some(name) = encoded.map(percent_decode).filter(|n| !n.is_empty()) {
                return Some(name);
            }
        } else if key.eq_ignore_ascii_case("filename") {
            let value = unquote(raw);
            if !value.is_empty() {
                plain = Some(value);
            }
        }
    }

    plain
}

/// `key=value` pairs after the disposition type.
fn params(header_value: &str) -> impl Iterator<Item = (&str, &str)> {
    header_value
        .split(';')
        .skip(1)
        .filter_map(|p| p.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
}

fn unquote(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
    else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            if c != '"' && c != '\\' {
                out.push('\\');
            }
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    if escaped {
        out.push('\\');
    }
    out
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hi = hex_value(bytes[i + 1]);
            let lo = hex_value(bytes[i + 2]);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
