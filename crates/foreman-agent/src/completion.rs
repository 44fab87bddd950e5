//! Completion token detection.
//!
//! This is the only place that decides whether free text ends a run.
//!
//! Rule: the content contains the token as a whole word. The match is case-sensitive, and
//! the characters immediately before and after the match (if any) must not be ASCII
//! alphanumerics or `_`. So with token `DONE`, `"DONE"`, `"All tests pass. DONE."` and
//! `"**DONE**"` match while `"UNDONE"`, `"done"` and `"DONE_SOON"` do not.

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether `content` contains `token` as a whole word.
pub fn contains_completion_token(content: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    content.match_indices(token).any(|(start, _)| {
        let before = content[..start].chars().next_back();
        let after = content[start + token.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// Remove whole-word occurrences of `token` and trim the remainder.
pub fn strip_completion_token(content: &str, token: &str) -> String {
    if token.is_empty() {
        return content.trim().to_string();
    }
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for (start, _) in content.match_indices(token) {
        let before = content[..start].chars().next_back();
        let after = content[start + token.len()..].chars().next();
        if before.is_some_and(is_word_char) || after.is_some_and(is_word_char) {
            continue;
        }
        out.push_str(&content[cursor..start]);
        cursor = start + token.len();
    }
    out.push_str(&content[cursor..]);
    out.trim().to_string()
}
