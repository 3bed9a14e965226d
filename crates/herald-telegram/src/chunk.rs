//! Word-boundary chunking of oversized message text.

/// Splits `text` into ordered chunks of at most `max_len` characters.
///
/// Each step consumes either the longest run up to `max_len` characters that
/// ends at a whitespace boundary or at end of input, or, when no boundary is
/// in range, exactly `max_len` characters of an unbreakable run. The forced
/// cut guarantees forward progress on boundary-free input. Chunks are
/// trimmed; chunks that trim to empty are dropped. Limits are in characters,
/// not bytes.
pub fn split_chunks(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
        if start >= chars.len() {
            break;
        }

        let window_end = (start + max_len).min(chars.len());
        let mut end = window_end;

        if window_end < chars.len() && !chars[window_end].is_whitespace() {
            // Prefer the last whitespace in range; without one this is an
            // unbreakable run and the cut lands exactly at the limit.
            if let Some(boundary) = (start..window_end).rev().find(|&i| chars[i].is_whitespace()) {
                end = boundary;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        start = end;
    }

    chunks
}
