//! Cleanup of process output before it is embedded in a JSON text frame.
//!
//! The exec client hands us output in arbitrary chunks, so a multi-byte
//! character can be split across two writes. JSON strings must be valid
//! UTF-8; dangling bytes are dropped, not replaced with `U+FFFD`.

use std::borrow::Cow;

/// Drop every byte that does not belong to a valid UTF-8 character.
///
/// Valid characters are kept in order, including a literally encoded
/// `U+FFFD`. Already-valid input is returned borrowed without copying.
pub fn sanitize(bytes: &[u8]) -> Cow<'_, str> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    Cow::Owned(out)
}
