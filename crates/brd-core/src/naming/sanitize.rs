//! Entry-name sanitization.

const NAME_MAX: usize = 255;

/// Turns a candidate filename into a single flat archive entry name.
///
/// Path separators, NUL, whitespace and control characters become `_` (runs
/// collapsed); leading/trailing dots, spaces and underscores are trimmed and
/// the result is cut to 255 bytes on a char boundary.
pub fn sanitize_entry_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let unsafe_char = c == '/' || c == '\\' || c.is_control() || c.is_whitespace();
        if unsafe_char {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let mut trimmed = out.trim_matches(|c| c == '.' || c == '_');
    if trimmed.len() > NAME_MAX {
        let mut cut = NAME_MAX;
        while !trimmed.is_char_boundary(cut) {
            cut -= 1;
        }
        trimmed = &trimmed[..cut];
    }
    trimmed.to_string()
}
