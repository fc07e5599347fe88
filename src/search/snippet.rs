/// Characters of context kept on each side of a match
pub const CONTEXT_CHARS: usize = 50;

/// Hard cap on snippet length, ellipsis markers included
pub const MAX_SNIPPET_CHARS: usize = 150;

const ELLIPSIS: &str = "...";

/// Extract a bounded excerpt of `text` around the match at `match_start`
/// (character offset) spanning `match_len` characters.
///
/// The window holds `CONTEXT_CHARS` characters on each side of the match,
/// clamped to the text. A leading `...` marks a window that does not start at
/// the beginning of the text, a trailing `...` one that stops before its end.
/// Snippets longer than `MAX_SNIPPET_CHARS` are cut down again:
///
/// - window at the start of the text: first 147 characters, then `...`
/// - window at the end of the text: `...`, then the last 147 characters
/// - otherwise: characters `[50, 147)` of the snippet wrapped in `...`
///
/// All offsets count characters, not bytes, so multi-byte text is never split.
pub fn extract_snippet(text: &str, match_start: usize, match_len: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let text_len = chars.len();

    let start = match_start.saturating_sub(CONTEXT_CHARS).min(text_len);
    let end = (match_start + match_len + CONTEXT_CHARS).min(text_len);

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.extend(&chars[start..end]);
    if end < text_len {
        snippet.push_str(ELLIPSIS);
    }

    let snippet_chars: Vec<char> = snippet.chars().collect();
    if snippet_chars.len() <= MAX_SNIPPET_CHARS {
        return snippet;
    }

    let keep = MAX_SNIPPET_CHARS - ELLIPSIS.len();
    if start == 0 {
        let mut truncated: String = snippet_chars[..keep].iter().collect();
        truncated.push_str(ELLIPSIS);
        truncated
    } else if end == text_len {
        let mut truncated = ELLIPSIS.to_string();
        truncated.extend(&snippet_chars[snippet_chars.len() - keep..]);
        truncated
    } else {
        let mut truncated = ELLIPSIS.to_string();
        truncated.extend(&snippet_chars[CONTEXT_CHARS..keep]);
        truncated.push_str(ELLIPSIS);
        truncated
    }
}
