//! RFC 2047 encoded words for non-ASCII header text.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::borrow::Cow;

/// Longest chunk of UTF-8 input per encoded word; 45 bytes become 60 base64
/// characters, keeping each word under the 75 character limit.
const MAX_CHUNK: usize = 45;

/// Encodes `text` as one or more `=?utf-8?B?...?=` words if it contains
/// anything outside printable ASCII; otherwise returns it unchanged.
#[must_use]
pub fn encode_header_text(text: &str) -> Cow<'_, str> {
    if text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return Cow::Borrowed(text);
    }

    let mut words = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for (idx, ch) in text.char_indices() {
        let next = idx + ch.len_utf8();
        if next - start > MAX_CHUNK {
            words.push(encoded_word(&text[start..end]));
            start = end;
        }
        end = next;
    }
    words.push(encoded_word(&text[start..end]));

    Cow::Owned(words.join(" "))
}

fn encoded_word(chunk: &str) -> String {
    format!("=?utf-8?B?{}?=", STANDARD.encode(chunk.as_bytes()))
}
