//! Helpers for emitting Graphviz DOT.

/// Escapes a string for use inside a quoted DOT label.
///
/// Quotes, backslashes, line breaks and angle brackets are escaped; carriage
/// returns are dropped.
///
/// # Examples
///
/// ```rust
/// use goscope::utils::escape_dot;
///
/// assert_eq!(escape_dot("v := <-ch"), "v := \\<-ch");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '<' => out.push_str("\\<"),
            '>' => out.push_str("\\>"),
            _ => out.push(c),
        }
    }
    out
}
