//! Character-based text chunking with overlap.

/// Split `text` into chunks of at most `chunk_size` characters, with
/// consecutive chunks sharing `overlap` characters.
///
/// Boundaries are character boundaries, never byte offsets, so multi-byte
/// input is safe. Whitespace-only chunks are dropped. An `overlap` of
/// `chunk_size` or more is clamped so the window always advances.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if chunk_size == 0 || text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}
