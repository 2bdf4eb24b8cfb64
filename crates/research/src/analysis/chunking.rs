//! Character-based splitting of long documents.

/// Split `text` into windows of `size` characters, each starting
/// `size - overlap` characters after the previous one.
///
/// Offsets count `char`s, so slices always land on UTF-8 boundaries. The
/// final window may be shorter than `size`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<&str> {
    let size = size.max(1);
    let step = size.saturating_sub(overlap).max(1);

    // Byte offset of every char, plus the end of the string.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let char_count = bounds.len();
    bounds.push(text.len());

    (0..char_count)
        .step_by(step)
        .map(|start| {
            let end = (start + size).min(char_count);
            &text[bounds[start]..bounds[end]]
        })
        .collect()
}

/// Cut `text` to at most `max_chars` characters, reporting whether anything
/// was dropped.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}
