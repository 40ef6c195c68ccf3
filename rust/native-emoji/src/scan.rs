//! Scan driver: replace every pending emoji image under a root

use std::sync::LazyLock;

use emoji_dom::{Compound, Document, NodeId, SelectorList};

use crate::replacer::try_replace;
use crate::{EMOJI_CLASS, REPLACED_MARKER};

/// `img.emoji`
pub(crate) static EMOJI_IMAGE: LazyLock<SelectorList> =
    LazyLock::new(|| Compound::tag("img").class(EMOJI_CLASS).into());

/// `img.emoji:not(.native-emoji-replaced)`
pub(crate) static PENDING_EMOJI_IMAGE: LazyLock<SelectorList> = LazyLock::new(|| {
    Compound::tag("img")
        .class(EMOJI_CLASS)
        .not(Compound::any().class(REPLACED_MARKER))
        .into()
});

/// Replace every pending emoji image below `root` (the whole document when
/// `None`), in document order. Returns how many were replaced.
pub fn scan(document: &mut Document, root: Option<NodeId>) -> usize {
    let root = root.unwrap_or_else(|| document.root());
    let images = document.query_selector_all(root, &PENDING_EMOJI_IMAGE);
    if images.is_empty() {
        return 0;
    }

    let replaced = images
        .into_iter()
        .filter(|&image| try_replace(document, image).is_replaced())
        .count();
    log::debug!("scan of {} replaced {} image(s)", root, replaced);
    replaced
}
