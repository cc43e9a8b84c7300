//! Validation helpers used by the input types.

/// Returns `true` if `s` parses as an absolute URL.
pub fn is_url(s: &str) -> bool {
    url::Url::parse(s).is_ok()
}

/// Escape `%`, `_` and `\` so `s` matches literally inside a LIKE pattern.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Wrap `s` as a substring pattern: `%<escaped>%`.
pub fn contains_pattern(s: &str) -> String {
    format!("%{}%", escape_like(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_check() {
        assert!(is_url("http://c1.img"));
        assert!(is_url("https://example.com/logo.png"));
        assert!(!is_url("not-a-url"));
        assert!(!is_url(""));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(contains_pattern("J1"), "%J1%");
        assert_eq!(contains_pattern("'; DROP TABLE jobs; --"), "%'; DROP TABLE jobs; --%");
    }
}
