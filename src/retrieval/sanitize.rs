use std::borrow::Cow;

use crate::models::Chunk;

/// Marker substituted for anything that cannot travel as UTF-8 text
pub const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

/// Decode raw bytes as UTF-8, replacing invalid sequences with U+FFFD.
pub fn clean_bytes(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Replace NUL and Unicode noncharacters with U+FFFD.
///
/// Extracted PDF text regularly carries these; they are valid `char`s but not
/// valid for interchange and break downstream encoders. Text without them is
/// returned borrowed.
pub fn clean_text(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_unrepresentable) {
        return Cow::Borrowed(text);
    }

    Cow::Owned(
        text.chars()
            .map(|c| if is_unrepresentable(c) { REPLACEMENT } else { c })
            .collect(),
    )
}

/// Sanitize chunk texts in place before they are embedded
pub fn sanitize_chunks(chunks: &mut [Chunk]) {
    for chunk in chunks.iter_mut() {
        if let Cow::Owned(cleaned) = clean_text(&chunk.text) {
            chunk.text = cleaned;
        }
    }
}

fn is_unrepresentable(c: char) -> bool {
    let code = c as u32;
    code == 0 || (0xFDD0..=0xFDEF).contains(&code) || (code & 0xFFFE) == 0xFFFE
}
