//! HTML sanitizer for marketplace product descriptions.
//!
//! Runs in a fixed order:
//! 1. images go away, together with neighbouring caption text (size charts, "see photo" notes)
//! 2. forbidden elements go away with their content
//! 3. any other element outside the whitelist is replaced by its children
//! 4. the fragment is rendered back to HTML without document scaffolding, then parsed and
//!    rendered once more so the markup is in the shape a parser would give it

pub mod parse;
pub mod rules;
pub mod serialize;
pub mod tree;

use std::collections::HashSet;

use tracing::{debug, warn};

use self::{
    parse::parse_fragment,
    rules::{contains_caption_keyword, TagClass},
    serialize::render,
    tree::{Fragment, NodeId},
};

/// Clean one description fragment. Never fails: unparsable input yields an empty string.
pub fn sanitize(markup: &str) -> String {
    let markup = markup.trim();
    if markup.is_empty() {
        return String::new();
    }

    match parse_fragment(markup) {
        Some(fragment) => clean_fragment(fragment),
        None => {
            warn!(len = markup.len(), "no parser accepted description markup");
            String::new()
        }
    }
}

/// Same as [`sanitize`], treating absent markup as empty.
pub fn sanitize_optional(markup: Option<&str>) -> String {
    markup.map(sanitize).unwrap_or_default()
}

fn clean_fragment(mut fragment: Fragment) -> String {
    remove_image_captions(&mut fragment);
    remove_forbidden(&mut fragment);
    unwrap_unclassified(&mut fragment);
    normalize(render(&fragment)).trim().to_string()
}

/// Unwrapping can leave nesting a parser would restructure, such as `<p>` inside `<p>`.
/// Parsing the rendered markup once more settles it, so cleaning clean output is a no-op.
fn normalize(rendered: String) -> String {
    match parse_fragment(&rendered) {
        Some(fragment) => render(&fragment),
        None => rendered,
    }
}

fn remove_image_captions(fragment: &mut Fragment) {
    let mut marked: HashSet<NodeId> = HashSet::new();

    let images = fragment
        .elements()
        .into_iter()
        .filter(|&id| fragment.tag_name(id) == Some("img"));
    for img in images {
        marked.insert(img);

        if let Some(parent) = fragment.parent(img).filter(|&p| fragment.is_element(p)) {
            if contains_caption_keyword(&fragment.text_content(parent)) {
                marked.insert(parent);
                continue;
            }
        }

        let siblings = [
            fragment.previous_element_sibling(img),
            fragment.next_element_sibling(img),
        ];
        for sibling in siblings.into_iter().flatten() {
            if contains_caption_keyword(&fragment.text_content(sibling)) {
                marked.insert(sibling);
            }
        }
    }

    if marked.is_empty() {
        return;
    }

    // Shallow first: once an ancestor is gone its marked descendants are skipped.
    let mut doomed: Vec<NodeId> = fragment
        .elements()
        .into_iter()
        .filter(|id| marked.contains(id))
        .collect();
    doomed.sort_by_key(|&id| fragment.depth(id));

    debug!(count = doomed.len(), "removing images and captions");
    for id in doomed {
        if !fragment.is_attached(id) {
            continue;
        }
        if let Err(err) = fragment.detach(id) {
            debug!(error = %err, "skipping caption removal");
        }
    }
}

fn remove_forbidden(fragment: &mut Fragment) {
    for id in fragment.elements() {
        let class = fragment.tag_name(id).map(TagClass::of);
        if class != Some(TagClass::Forbidden) || !fragment.is_attached(id) {
            continue;
        }
        if let Err(err) = fragment.detach(id) {
            debug!(error = %err, "skipping forbidden element removal");
        }
    }
}

fn unwrap_unclassified(fragment: &mut Fragment) {
    for id in fragment.elements() {
        let class = fragment.tag_name(id).map(TagClass::of);
        if class == Some(TagClass::Allowed) {
            continue;
        }
        if let Err(err) = fragment.unwrap(id) {
            debug!(error = %err, "skipping unwrap");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        parse::{FragmentParser, LenientParser},
        *,
    };

    const FORBIDDEN_MARKERS: &[&str] = &[
        "<img", "<iframe", "<script", "<object", "<video", "<style", "<form", "<span", "<div",
        "<table", "<a ",
    ];

    #[test]
    fn unwraps_unclassified_tags() {
        assert_eq!(sanitize("<div>Hello</div>"), "Hello");
        assert_eq!(
            sanitize("<span>Krásné <em>tričko</em></span>"),
            "Krásné tričko"
        );
    }

    #[test]
    fn forbidden_tags_lose_their_content() {
        assert_eq!(sanitize("<script>alert(1)</script>Hi"), "Hi");
        assert_eq!(
            sanitize("<p>A</p><iframe src=\"v\"></iframe><video>clip</video>"),
            "<p>A</p>"
        );
        assert_eq!(sanitize("<div><form><input>Send</form>Text</div>"), "Text");
    }

    #[test]
    fn caption_before_image_is_removed() {
        assert_eq!(sanitize("<p>Viz foto níže:</p><img src=\"x.jpg\">"), "");
    }

    #[test]
    fn plain_paragraph_before_image_survives() {
        assert_eq!(
            sanitize("<p>Popis produktu</p><img src=\"x.jpg\">"),
            "<p>Popis produktu</p>"
        );
    }

    #[test]
    fn caption_after_image_is_removed() {
        assert_eq!(
            sanitize("<img src=\"a.jpg\"><p>Rozměry viz obrázek</p><p>Dál</p>"),
            "<p>Dál</p>"
        );
    }

    #[test]
    fn captioned_parent_is_removed_whole() {
        assert_eq!(
            sanitize("<p><img src=\"t.png\"> Velikostní   TABULKA</p><p>Zbytek</p>"),
            "<p>Zbytek</p>"
        );
    }

    #[test]
    fn parent_without_keyword_keeps_its_text() {
        assert_eq!(
            sanitize("<p>Bavlna <img src=\"t.png\">100 %</p>"),
            "<p>Bavlna 100 %</p>"
        );
    }

    #[test]
    fn nested_marks_do_not_break_removal() {
        // the second image marks the outer div, which already holds the marked paragraph
        let html = "<div><p>Rozměry<img src=\"a\"></p><img src=\"b\"></div><p>Ok</p>";
        assert_eq!(sanitize(html), "<p>Ok</p>");
    }

    #[test]
    fn allowed_markup_and_attributes_survive() {
        let html = "<h2>Parametry</h2><ul><li><strong>Barva:</strong> modrá</li><li>Velikost<br>M</li></ul><p style=\"color:red\">x</p>";
        assert_eq!(sanitize(html), html);
    }

    #[test]
    fn uppercase_tags_are_classified() {
        assert_eq!(sanitize("<IMG SRC=x><P>Text</P><DIV>more</DIV>"), "<p>Text</p>more");
    }

    #[test]
    fn table_degrades_to_its_cells() {
        assert_eq!(
            sanitize("<table><tr><td><b>Bold</b></td></tr></table>"),
            "<b>Bold</b>"
        );
    }

    #[test]
    fn empty_and_absent_input() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize(" \n\t "), "");
        assert_eq!(sanitize_optional(None), "");
        assert_eq!(sanitize_optional(Some("<b>x</b>")), "<b>x</b>");
        assert_eq!(sanitize("<img src=\"only.jpg\">"), "");
    }

    #[test]
    fn text_is_escaped_on_output() {
        assert_eq!(sanitize("<span>5 &lt; 6 &amp; 7</span>"), "5 &lt; 6 &amp; 7");
    }

    #[test]
    fn output_is_closed_over_allowed_tags() {
        let inputs = [
            "<div><span>a</span><img src=x><iframe></iframe></div>",
            "<table><tr><td>Cell<object>o</object></td></tr></table>",
            "<a href=\"/x\">link</a><style>p{}</style><form><button>b</button></form>",
            "<section><article><h3>Title</h3><video src=v></video></article></section>",
        ];
        for input in inputs {
            let output = sanitize(input);
            for marker in FORBIDDEN_MARKERS {
                assert!(
                    !output.contains(marker),
                    "{marker} survived in {output:?} (from {input:?})"
                );
            }
        }
    }

    #[test]
    fn second_pass_changes_nothing() {
        let inputs = [
            "<div>Hello</div>",
            "<script>alert(1)</script>Hi",
            "<p>Popis produktu</p><img src=\"x.jpg\">",
            "<ul><li>a<li>b</ul><p>c<p>d",
            "<b><p>bold para</p></b>",
            "<h1>T</h1><span>5 &lt; 6</span>&nbsp;end",
            "<div><p>Rozměry<img src=\"a\"></p></div><p>Ok</p>",
            "<p><table><tr><td><p>x</p></td></tr></table></p>",
            "<h1><div><h2>x</h2></div></h1>",
            "<ul><li>a<table><tr><td><li>b</li></td></tr></table></li></ul>",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn unwrapping_never_leaves_invalid_nesting() {
        assert!(!sanitize("<p><table><tr><td><p>x</p></td></tr></table></p>").contains("<p><p>"));
        assert_eq!(sanitize("<h1><div><h2>x</h2></div></h1>"), "<h1></h1><h2>x</h2>");
        assert_eq!(
            sanitize("<ul><li>a<table><tr><td><li>b</li></td></tr></table></li></ul>"),
            "<ul><li>a</li><li>b</li></ul>"
        );
    }

    #[test]
    fn deeply_nested_markup_does_not_exhaust_the_stack() {
        let depth = 20_000;
        let html = format!("{}x{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let cleaned = std::thread::Builder::new()
            .stack_size(1024 * 1024)
            .spawn(move || sanitize(&html))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(cleaned, "x");
    }

    #[test]
    fn lenient_fragments_go_through_the_same_pipeline() {
        let fragment = LenientParser
            .parse("<p>Viz foto</p><img src=x><p>Popis</p><script>x()</script><div>konec</div>")
            .unwrap();
        assert_eq!(clean_fragment(fragment), "<p>Popis</p>konec");
    }
}
