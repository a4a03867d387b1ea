use crate::models::search::{find_ignore_case, MatchResult, SearchMode};

pub const DEFAULT_CONTEXT_CHARS: usize = 20;

const ELLIPSIS: &str = "...";

/// Searches decoded document text line by line. Stateless; callers hold the
/// text between keystrokes.
pub fn search(full_text: &str, query: &str, mode: SearchMode) -> MatchResult {
    search_with_context(full_text, query, mode, DEFAULT_CONTEXT_CHARS)
}

/// Like [`search`], with `context_chars` characters kept on each side of a
/// CONTAINS match.
pub fn search_with_context(
    full_text: &str,
    query: &str,
    mode: SearchMode,
    context_chars: usize,
) -> MatchResult {
    if query.trim().is_empty() || full_text.trim().is_empty() {
        return MatchResult::new();
    }

    let mut results = MatchResult::new();
    match mode {
        SearchMode::Contains => {
            let needle: Vec<char> = query.chars().collect();
            for line in split_lines(full_text) {
                let chars: Vec<char> = line.chars().collect();
                collect_windows(&chars, &needle, context_chars, &mut results);
            }
        }
        SearchMode::StartsWith | SearchMode::EndsWith => {
            results.extend(
                split_lines(full_text)
                    .filter(|line| mode.matches(line, query))
                    .map(str::to_string),
            );
        }
    }
    results
}

/// Lines ended by `\n`, `\r\n` or a lone `\r`. Text after the last
/// terminator is a line of its own, even when empty.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(text);
    std::iter::from_fn(move || {
        let current = rest?;
        match current.find(['\r', '\n']) {
            Some(idx) => {
                let width = if current[idx..].starts_with("\r\n") { 2 } else { 1 };
                rest = Some(&current[idx + width..]);
                Some(&current[..idx])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}

/// One window per non-overlapping occurrence, scanning left to right.
fn collect_windows(line: &[char], needle: &[char], context_chars: usize, out: &mut MatchResult) {
    let mut from = 0;
    while let Some(index) = find_ignore_case(line, needle, from) {
        let match_end = index + needle.len();
        let start = index.saturating_sub(context_chars);
        let end = match_end.saturating_add(context_chars).min(line.len());

        let mut window = String::with_capacity(end - start + 2 * ELLIPSIS.len());
        window.push_str(ELLIPSIS);
        window.extend(&line[start..end]);
        window.push_str(ELLIPSIS);
        out.push(window);

        from = match_end;
    }
}
