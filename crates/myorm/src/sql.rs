//! Small lexical helpers over SQL text.
//!
//! Nothing here parses SQL. The builder only needs to find the leading
//! keyword of a statement and to count `?` placeholders the way the server
//! will see them.

/// Strip leading whitespace, SQL comments (`--`, `#` and `/* */`) and
/// parentheses from a SQL string to find the first meaningful keyword.
pub(crate) fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") || s.starts_with('#') {
            match s.find('\n') {
                Some(pos) => {
                    s = &s[pos + 1..];
                    continue;
                }
                None => return "",
            }
        }
        if s.starts_with("/*") {
            match s.find("*/") {
                Some(pos) => {
                    s = &s[pos + 2..];
                    continue;
                }
                None => return "",
            }
        }
        if let Some(rest) = s.strip_prefix('(') {
            s = rest;
            continue;
        }
        if s == before {
            break;
        }
    }
    s
}

/// Case-insensitive keyword prefix check.
pub(crate) fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    match s.get(0..keyword.len()) {
        Some(prefix) => {
            prefix.eq_ignore_ascii_case(keyword)
                && !s[keyword.len()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

/// Count `?` placeholder markers.
///
/// Markers inside quoted strings (`'...'`, `"..."`) and backquoted
/// identifiers are literal text and do not count. Quotes may be escaped by
/// doubling or with a backslash.
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == '\\' && q != '`' {
                    chars.next();
                } else if c == q {
                    if chars.peek() == Some(&q) {
                        chars.next();
                    } else {
                        quote = None;
                    }
                }
            }
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '?' => count += 1,
                _ => {}
            },
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_parens() {
        assert_eq!(strip_sql_prefix("  -- hi\n SELECT 1"), "SELECT 1");
        assert_eq!(strip_sql_prefix("# note\n/* x */ (SELECT 1)"), "SELECT 1)");
        assert_eq!(strip_sql_prefix("/* unclosed"), "");
    }

    #[test]
    fn keyword_needs_word_boundary() {
        assert!(starts_with_keyword("select * from t", "SELECT"));
        assert!(starts_with_keyword("DELETE", "DELETE"));
        assert!(!starts_with_keyword("SELECTED", "SELECT"));
        assert!(!starts_with_keyword("SEL", "SELECT"));
    }

    #[test]
    fn counts_markers_outside_literals() {
        assert_eq!(count_placeholders("id = ?"), 1);
        assert_eq!(count_placeholders("a = ? OR b = ?"), 2);
        assert_eq!(count_placeholders("name = 'who?' AND id = ?"), 1);
        assert_eq!(count_placeholders(r"note = 'it''s ?' AND x = ?"), 1);
        assert_eq!(count_placeholders(r"note = 'a\'?' AND x = ?"), 1);
        assert_eq!(count_placeholders("`odd?col` = ?"), 1);
        assert_eq!(count_placeholders("1=1"), 0);
    }
}
