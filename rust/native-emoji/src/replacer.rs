//! Matcher/replacer for a single emoji image
//!
//! An eligible image is an `<img>` without the replaced marker whose trimmed
//! `alt` contains an emoji run. It is swapped for
//! `<span class="native-emoji-replacement native-emoji-replaced">` holding
//! the first run as text, labelled for assistive technology and styled to
//! fill the image's box. Style failures are logged and never block the swap.
//! The swapped-out image is released.

use emoji_dom::{Document, DomError, NodeId};

use crate::error::NativeEmojiError;
use crate::matcher::first_emoji_sequence;
use crate::style::ReplacementStyle;
use crate::{REPLACED_MARKER, REPLACEMENT_CLASS};

/// Why an image was left untouched
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Skip {
    /// Null/stale reference or not an `<img>` element
    NotAnImage,
    AlreadyReplaced,
    /// `alt` absent or blank
    MissingAlt,
    NoEmoji,
    /// The image has no parent to be replaced in
    Detached,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Replacement {
    /// The image was swapped for this element
    Replaced(NodeId),
    Skipped(Skip),
    /// A document operation failed; the image was left in place
    Aborted,
}

impl Replacement {
    pub fn is_replaced(&self) -> bool {
        matches!(self, Replacement::Replaced(_))
    }
}

/// Replace `image` with native emoji text if it is eligible
pub fn try_replace(document: &mut Document, image: NodeId) -> Replacement {
    match replace_image(document, image) {
        Ok(Replacement::Skipped(skip)) => {
            log::trace!("left {} in place: {:?}", image, skip);
            Replacement::Skipped(skip)
        }
        Ok(outcome) => outcome,
        Err(err) => {
            log::error!("failed to replace emoji image {}: {}", image, err);
            Replacement::Aborted
        }
    }
}

fn replace_image(document: &mut Document, image: NodeId) -> Result<Replacement, NativeEmojiError> {
    if !document.is_image(image) {
        return Ok(Replacement::Skipped(Skip::NotAnImage));
    }
    if document.has_class(image, REPLACED_MARKER) {
        return Ok(Replacement::Skipped(Skip::AlreadyReplaced));
    }

    let alt = document
        .get_attribute(image, "alt")
        .unwrap_or_default()
        .trim()
        .to_string();
    if alt.is_empty() {
        return Ok(Replacement::Skipped(Skip::MissingAlt));
    }
    let Some(sequence) = first_emoji_sequence(&alt) else {
        return Ok(Replacement::Skipped(Skip::NoEmoji));
    };
    if document.parent(image).is_none() {
        return Ok(Replacement::Skipped(Skip::Detached));
    }

    let label = document
        .get_attribute(image, "aria-label")
        .filter(|label| !label.is_empty())
        .unwrap_or(alt.as_str())
        .to_string();

    let span = document.create_element("span");
    document.set_attribute(span, "class", &format!("{REPLACEMENT_CLASS} {REPLACED_MARKER}"))?;
    document.set_attribute(span, "aria-hidden", "false")?;
    document.set_attribute(span, "aria-label", &label)?;
    document.set_text_content(span, sequence)?;

    if let Err(err) = copy_style(document, image, span) {
        log::warn!("could not copy style from {} onto its replacement: {}", image, err);
    }

    if !document.replace_with(image, span)? {
        document.release(span)?;
        return Ok(Replacement::Skipped(Skip::Detached));
    }
    log::debug!("replaced {} with {} ({})", image, span, sequence);
    if let Err(err) = document.release(image) {
        log::warn!("could not release replaced image {}: {}", image, err);
    }
    Ok(Replacement::Replaced(span))
}

fn copy_style(document: &mut Document, image: NodeId, span: NodeId) -> Result<(), DomError> {
    let style = match document.computed_style(image) {
        Ok(computed) => ReplacementStyle::from_computed(&computed),
        Err(DomError::Detached(_)) => ReplacementStyle::unresolved(document.rendered_height(image)?),
        Err(err) => return Err(err),
    };
    for (name, value) in style.declarations() {
        document.set_style_property(span, name, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use emoji_dom::{parse_html, SelectorList};

    fn image(doc: &Document) -> NodeId {
        let selectors = SelectorList::parse("img").unwrap();
        doc.query_selector(doc.root(), &selectors).unwrap()
    }

    fn span(doc: &Document) -> NodeId {
        let selectors = SelectorList::parse("span.native-emoji-replaced").unwrap();
        doc.query_selector(doc.root(), &selectors).unwrap()
    }

    #[test]
    fn test_replaces_with_styled_span() {
        let mut doc = parse_html(r#"<p>hi <img class="emoji" alt="grinning face 😀" height="32">!</p>"#);
        let img = image(&doc);
        let p = doc.parent(img).unwrap();

        let outcome = try_replace(&mut doc, img);
        let Replacement::Replaced(span) = outcome else {
            panic!("expected a replacement, got {outcome:?}");
        };

        assert_eq!(doc.children(p)[1], span);
        assert_eq!(doc.parent(img), None);
        assert_eq!(doc.text_content(span), "😀");
        assert_eq!(
            doc.get_attribute(span, "class"),
            Some("native-emoji-replacement native-emoji-replaced")
        );
        assert_eq!(doc.get_attribute(span, "aria-hidden"), Some("false"));
        assert_eq!(doc.get_attribute(span, "aria-label"), Some("grinning face 😀"));
        assert_eq!(doc.style_property(span, "font-size").as_deref(), Some("24px"));
        assert_eq!(doc.style_property(span, "line-height").as_deref(), Some("32px"));
        assert_eq!(doc.style_property(span, "display").as_deref(), Some("inline-block"));
        assert_eq!(doc.style_property(span, "vertical-align").as_deref(), Some("baseline"));
        assert_eq!(doc.style_property(span, "margin").as_deref(), Some("0px"));
        assert_eq!(doc.style_property(span, "padding").as_deref(), Some("0px"));
    }

    #[test]
    fn test_explicit_label_wins() {
        let mut doc = parse_html(r#"<img class="emoji" alt=" 🎉 " aria-label="Party popper">"#);
        let img = image(&doc);
        try_replace(&mut doc, img);
        assert_eq!(doc.get_attribute(span(&doc), "aria-label"), Some("Party popper"));

        let mut doc = parse_html(r#"<img class="emoji" alt=" 🎉 tada " aria-label="">"#);
        let img = image(&doc);
        try_replace(&mut doc, img);
        assert_eq!(doc.get_attribute(span(&doc), "aria-label"), Some("🎉 tada"));
    }

    #[test]
    fn test_preconditions_are_silent_no_ops() {
        let cases = [
            (r#"<p></p>"#, Skip::NotAnImage),
            (r#"<img class="emoji native-emoji-replaced" alt="😀">"#, Skip::AlreadyReplaced),
            (r#"<img class="emoji">"#, Skip::MissingAlt),
            (r#"<img class="emoji" alt="   ">"#, Skip::MissingAlt),
            (r#"<img class="emoji" alt="thumbs up">"#, Skip::NoEmoji),
        ];
        for (html, expected) in cases {
            let mut doc = parse_html(html);
            let target = doc.children(doc.root())[0];
            let before = doc.to_html();

            assert_eq!(try_replace(&mut doc, target), Replacement::Skipped(expected), "{html}");
            assert_eq!(doc.to_html(), before);
        }
    }

    #[test]
    fn test_null_and_stale_references() {
        let mut doc = parse_html("<p></p>");
        assert_eq!(try_replace(&mut doc, NodeId::NONE), Replacement::Skipped(Skip::NotAnImage));
        let stale = doc.create_element("img");
        doc.release(stale).unwrap();
        assert_eq!(try_replace(&mut doc, stale), Replacement::Skipped(Skip::NotAnImage));
    }

    #[test]
    fn test_parentless_image_is_skipped() {
        let mut doc = parse_html("");
        let img = doc.create_element("img");
        doc.set_attribute(img, "alt", "😀").unwrap();

        assert_eq!(try_replace(&mut doc, img), Replacement::Skipped(Skip::Detached));
        assert!(doc.is_image(img));
    }

    #[test]
    fn test_detached_image_is_styled_from_height_attribute() {
        // No cascade outside the document
        let mut doc = parse_html("<style>img { margin: 4px; vertical-align: middle }</style>");
        let container = doc.create_element("div");
        let img = doc.create_element("img");
        doc.set_attribute(img, "alt", "😀").unwrap();
        doc.set_attribute(img, "height", "32").unwrap();
        doc.append_child(container, img).unwrap();

        let Replacement::Replaced(span) = try_replace(&mut doc, img) else {
            panic!("detached subtree images are still replaced");
        };
        assert_eq!(doc.children(container), &[span]);
        assert_eq!(doc.text_content(span), "😀");
        assert_eq!(
            doc.get_attribute(span, "style"),
            Some("font-size: 24px; line-height: 32px; display: inline-block; vertical-align: baseline;")
        );
    }

    #[test]
    fn test_fractional_height_is_truncated() {
        let mut doc = parse_html(r#"<img class="emoji" alt="😀" height="22.5">"#);
        let img = image(&doc);
        let Replacement::Replaced(span) = try_replace(&mut doc, img) else {
            panic!("expected a replacement");
        };
        assert_eq!(doc.style_property(span, "line-height").as_deref(), Some("22px"));
        assert_eq!(doc.style_property(span, "font-size").as_deref(), Some("17px"));
    }

    #[test]
    fn test_replaced_image_is_released() {
        let mut doc = parse_html(r#"<p><img class="emoji" alt="😀"></p>"#);
        let img = image(&doc);
        let live = doc.len();

        assert!(try_replace(&mut doc, img).is_replaced());
        assert!(doc.node(img).is_none());
        // img out, span and its text in
        assert_eq!(doc.len(), live + 1);
    }

    #[test]
    fn test_replacement_is_never_rematched() {
        let mut doc = parse_html(r#"<img class="emoji" alt="😀">"#);
        let img = image(&doc);
        let Replacement::Replaced(span) = try_replace(&mut doc, img) else {
            panic!("expected a replacement");
        };
        assert_eq!(try_replace(&mut doc, span), Replacement::Skipped(Skip::NotAnImage));
    }
}
