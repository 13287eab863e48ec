//! Static tag vocabulary and caption heuristics for the marketplace whitelist.

use crate::util::text::normalize_for_match;

/// Elements removed together with everything inside them.
pub const FORBIDDEN_TAGS: &[&str] = &["img", "iframe", "script", "object", "video", "style", "form"];

/// Formatting elements the marketplace accepts.
pub const ALLOWED_TAGS: &[&str] = &[
    "p", "b", "strong", "ul", "li", "br", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Phrases that mark text next to an image as the image's caption.
pub const CAPTION_KEYWORDS: &[&str] = &[
    "velikostní tabulka",
    "tabulka velikostí",
    "rozměry",
    "viz foto",
    "viz obrázek",
    "viz obrázek níže",
    "viz foto níže",
    "velikostní tabulka viz",
    "rozměry viz",
];

/// HTML elements that never carry an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    Forbidden,
    Allowed,
    Unclassified,
}

impl TagClass {
    pub fn of(tag: &str) -> Self {
        if contains_tag(FORBIDDEN_TAGS, tag) {
            TagClass::Forbidden
        } else if contains_tag(ALLOWED_TAGS, tag) {
            TagClass::Allowed
        } else {
            TagClass::Unclassified
        }
    }
}

pub fn is_void_element(tag: &str) -> bool {
    contains_tag(VOID_ELEMENTS, tag)
}

/// Substring match of any caption keyword against case-folded, whitespace-collapsed text.
pub fn contains_caption_keyword(text: &str) -> bool {
    let normalized = normalize_for_match(text);
    if normalized.is_empty() {
        return false;
    }
    CAPTION_KEYWORDS
        .iter()
        .any(|keyword| normalized.contains(keyword))
}

fn contains_tag(set: &[&str], tag: &str) -> bool {
    set.iter().any(|candidate| candidate.eq_ignore_ascii_case(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_case_insensitively() {
        assert_eq!(TagClass::of("IMG"), TagClass::Forbidden);
        assert_eq!(TagClass::of("Strong"), TagClass::Allowed);
        assert_eq!(TagClass::of("h6"), TagClass::Allowed);
        assert_eq!(TagClass::of("span"), TagClass::Unclassified);
        assert_eq!(TagClass::of("table"), TagClass::Unclassified);
    }

    #[test]
    fn keyword_match_ignores_case_and_spacing() {
        assert!(contains_caption_keyword("VIZ   FOTO\nníže"));
        assert!(contains_caption_keyword("Přesné rozměry najdete v tabulce"));
        assert!(contains_caption_keyword("Tabulka  Velikostí"));
        assert!(!contains_caption_keyword("Popis produktu"));
        assert!(!contains_caption_keyword("   "));
    }
}
