use encoding_rs::{UTF_8, WINDOWS_1252};
use std::borrow::Cow;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode CSV bytes as UTF-8, falling back to Windows-1252.
///
/// The published files carry a single-byte `£` (0xA3), which is not valid
/// UTF-8. Windows-1252 maps every byte, so this never fails.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return text;
    }
    debug!(len = bytes.len(), "input is not UTF-8, decoding as windows-1252");
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    text
}
