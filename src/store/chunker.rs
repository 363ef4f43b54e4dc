// Separator-aware text splitter — the unit of retrieval is a bounded chunk.

const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Split `text` into chunks of at most `chunk_size` characters, preferring to
/// break at paragraph, line, sentence, and word boundaries (in that order).
/// Consecutive chunks share an `overlap`-character tail.
#[must_use]
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    // Byte offset of every char boundary, plus the end of the text.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain([text.len()])
        .collect();
    let total_chars = offsets.len() - 1;
    if total_chars <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start_char = 0_usize;

    loop {
        let ideal_end_char = (start_char + chunk_size).min(total_chars);
        let start_byte = offsets[start_char];
        let ideal_end_byte = offsets[ideal_end_char];

        let end_byte = if ideal_end_char == total_chars {
            ideal_end_byte
        } else {
            split_point(&text[start_byte..ideal_end_byte])
                .map_or(ideal_end_byte, |rel| start_byte + rel)
        };

        let chunk = text[start_byte..end_byte].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end_byte >= text.len() {
            break;
        }

        // First char index at or past the split point; split points land on
        // char boundaries because every separator is ASCII.
        let end_char = offsets.partition_point(|&b| b < end_byte);
        let overlapped = end_char.saturating_sub(overlap);
        start_char = if overlapped > start_char {
            overlapped
        } else {
            end_char
        };
        if start_char >= total_chars {
            break;
        }
    }

    chunks
}

/// Best break position inside `window`: the last separator occurrence in its
/// second half, tried in priority order. `None` means a hard cut.
fn split_point(window: &str) -> Option<usize> {
    let min_pos = window.len() / 2;
    for sep in SEPARATORS {
        if let Some(pos) = window.rfind(sep) {
            let boundary = pos + sep.len();
            if boundary > min_pos {
                return Some(boundary);
            }
        }
    }
    None
}
