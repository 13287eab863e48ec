use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};

/// Decode feed bytes: strict UTF-8, then the legacy code page, then lossy UTF-8.
pub fn decode_feed<'a>(bytes: &'a [u8], legacy: &'static Encoding) -> Cow<'a, str> {
    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return text;
    }

    if let Some(text) = legacy.decode_without_bom_handling_and_without_replacement(bytes) {
        tracing::debug!(encoding = legacy.name(), "feed is not valid UTF-8, decoded as legacy");
        return text;
    }

    tracing::debug!(
        encoding = legacy.name(),
        "feed matches neither UTF-8 nor legacy encoding, decoding lossily"
    );
    UTF_8.decode_without_bom_handling(bytes).0
}

/// Drop a leading BOM and the XML declaration. The text is already decoded, so an
/// `encoding` pseudo-attribute left in place would only mislead the XML reader.
pub fn strip_prolog(text: &str) -> &str {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let trimmed = text.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return &trimmed[end + 2..];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use encoding_rs::{SHIFT_JIS, WINDOWS_1250};

    use super::*;

    #[test]
    fn utf8_is_borrowed_as_is() {
        let decoded = decode_feed("Žluťoučký kůň".as_bytes(), WINDOWS_1250);
        assert!(matches!(decoded, Cow::Borrowed(_)));
        assert_eq!(decoded, "Žluťoučký kůň");
    }

    #[test]
    fn falls_back_to_windows_1250() {
        let (bytes, _, _) = WINDOWS_1250.encode("Žluťoučký kůň");
        assert_eq!(decode_feed(&bytes, WINDOWS_1250), "Žluťoučký kůň");
    }

    #[test]
    fn falls_back_to_lossy_utf8() {
        // a lone lead byte is invalid in both UTF-8 and Shift_JIS
        let bytes = b"abc\x81";
        assert_eq!(decode_feed(bytes, SHIFT_JIS), "abc\u{fffd}");
    }

    #[test]
    fn strips_bom_and_declaration() {
        let text = "\u{feff}<?xml version=\"1.0\" encoding=\"windows-1250\"?>\n<SHOP/>";
        assert_eq!(strip_prolog(text).trim(), "<SHOP/>");
        assert_eq!(strip_prolog("<SHOP/>"), "<SHOP/>");
    }
}
