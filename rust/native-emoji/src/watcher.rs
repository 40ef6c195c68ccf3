//! Change watcher
//!
//! Subscribes to child-list and `alt`/`class` attribute changes across the
//! whole document. Each delivered batch is walked in order: added elements
//! are replaced if they are emoji images and scanned for emoji images
//! below them; attribute changes on emoji images retry the replacement.
//! Records caused by our own replacements only ever add spans, which the
//! next delivery walks past.

use emoji_dom::{Document, MutationKind, MutationRecord, ObserverId, ObserverInit};

use crate::error::NativeEmojiError;
use crate::replacer::try_replace;
use crate::scan::{scan, EMOJI_IMAGE};
use crate::OBSERVED_ATTRIBUTES;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WatcherState {
    #[default]
    Uninstalled,
    Installed(ObserverId),
}

#[derive(Debug, Default)]
pub struct Watcher {
    state: WatcherState,
}

impl Watcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn is_installed(&self) -> bool {
        matches!(self.state, WatcherState::Installed(_))
    }

    /// Register on the document root. A watcher installs at most once.
    pub fn install(&mut self, document: &mut Document) -> Result<(), NativeEmojiError> {
        if self.is_installed() {
            return Err(NativeEmojiError::AlreadyInstalled);
        }
        let init = ObserverInit {
            child_list: true,
            attributes: true,
            subtree: true,
            attribute_filter: Some(OBSERVED_ATTRIBUTES.iter().map(|a| a.to_string()).collect()),
        };
        let root = document.root();
        let observer = document.observe(root, init)?;
        self.state = WatcherState::Installed(observer);
        log::info!("emoji watcher installed");
        Ok(())
    }

    /// Take the pending batch and process it. Returns the replacements made.
    pub fn deliver(&self, document: &mut Document) -> usize {
        let WatcherState::Installed(observer) = self.state else {
            return 0;
        };
        let records = document.take_records(observer);
        if records.is_empty() {
            return 0;
        }
        self.handle_batch(document, &records)
    }

    pub fn handle_batch(&self, document: &mut Document, records: &[MutationRecord]) -> usize {
        let mut replaced = 0;
        for record in records {
            match record.kind {
                MutationKind::ChildList => {
                    for &node in &record.added_nodes {
                        if !document.is_element(node) {
                            continue;
                        }
                        if document.matches(node, &EMOJI_IMAGE)
                            && try_replace(document, node).is_replaced()
                        {
                            replaced += 1;
                        }
                        replaced += scan(document, Some(node));
                    }
                }
                MutationKind::Attributes => {
                    let target = record.target;
                    if document.matches(target, &EMOJI_IMAGE)
                        && try_replace(document, target).is_replaced()
                    {
                        replaced += 1;
                    }
                }
            }
        }
        log::trace!("batch of {} record(s) replaced {}", records.len(), replaced);
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emoji_dom::{parse_html, DomError, SelectorList};

    fn installed(html: &str) -> (Document, Watcher) {
        let mut doc = parse_html(html);
        let mut watcher = Watcher::new();
        watcher.install(&mut doc).unwrap();
        (doc, watcher)
    }

    fn count(doc: &Document, selector: &str) -> usize {
        let selectors = SelectorList::parse(selector).unwrap();
        doc.query_selector_all(doc.root(), &selectors).len()
    }

    #[test]
    fn test_install_once() {
        let mut doc = parse_html("<p></p>");
        let mut watcher = Watcher::new();
        assert_eq!(watcher.state(), WatcherState::Uninstalled);

        watcher.install(&mut doc).unwrap();
        assert!(watcher.is_installed());
        let state = watcher.state();

        let err = watcher.install(&mut doc).unwrap_err();
        assert!(matches!(err, NativeEmojiError::AlreadyInstalled));
        assert_eq!(watcher.state(), state);
    }

    #[test]
    fn test_install_after_unload_fails() {
        let mut doc = parse_html("<p></p>");
        doc.unload();

        let err = Watcher::new().install(&mut doc).unwrap_err();
        assert!(matches!(err, NativeEmojiError::Dom(DomError::Unloaded)));
    }

    #[test]
    fn test_uninstalled_watcher_delivers_nothing() {
        let mut doc = parse_html("<main></main>");
        let main = doc.children(doc.root())[0];
        doc.set_inner_html(main, r#"<img class="emoji" alt="😀">"#).unwrap();

        assert_eq!(Watcher::new().deliver(&mut doc), 0);
        assert_eq!(count(&doc, "img"), 1);
    }

    #[test]
    fn test_bulk_insert_replaces_each_once() {
        let (mut doc, watcher) = installed("<main></main>");
        let main = doc.children(doc.root())[0];

        let nodes = doc.parse_fragment(concat!(
            r#"<div class="msg">"#,
            r#"<img class="emoji" alt="😀"><img class="emoji" alt="🎉"><b><img class="emoji" alt="👍"></b>"#,
            r#"</div>"#,
        ));
        doc.append_child(main, nodes[0]).unwrap();

        assert_eq!(watcher.deliver(&mut doc), 3);
        assert_eq!(count(&doc, "img"), 0);
        assert_eq!(count(&doc, "span.native-emoji-replaced"), 3);

        // The follow-up batch holds only our own swaps
        assert!(doc.has_pending_records());
        assert_eq!(watcher.deliver(&mut doc), 0);
        assert!(!doc.has_pending_records());
        assert_eq!(count(&doc, "span.native-emoji-replaced"), 3);
    }

    #[test]
    fn test_directly_added_image() {
        let (mut doc, watcher) = installed("<main></main>");
        let main = doc.children(doc.root())[0];
        let img = doc.create_element("img");
        doc.set_attribute(img, "class", "emoji").unwrap();
        doc.set_attribute(img, "alt", "🔥").unwrap();
        doc.append_child(main, img).unwrap();

        assert_eq!(watcher.deliver(&mut doc), 1);
        assert_eq!(doc.text_content(main), "🔥");
    }

    #[test]
    fn test_attribute_change_makes_image_eligible() {
        let (mut doc, watcher) = installed(r#"<p><img src="cat.png"></p>"#);
        let p = doc.children(doc.root())[0];
        let img = doc.children(p)[0];

        doc.set_attribute(img, "class", "emoji").unwrap();
        assert_eq!(watcher.deliver(&mut doc), 0);

        doc.set_attribute(img, "alt", "🎉").unwrap();
        assert_eq!(watcher.deliver(&mut doc), 1);
        assert_eq!(doc.text_content(p), "🎉");
    }

    #[test]
    fn test_unobserved_attributes_are_ignored() {
        let (mut doc, watcher) = installed(r#"<img class="emoji" src="a.png">"#);
        let img = doc.children(doc.root())[0];

        doc.set_attribute(img, "src", "b.png").unwrap();
        assert!(!doc.has_pending_records());
        assert_eq!(watcher.deliver(&mut doc), 0);
    }

    #[test]
    fn test_stale_records_are_harmless() {
        let (mut doc, watcher) = installed(r#"<p><img></p>"#);
        let p = doc.children(doc.root())[0];
        let img = doc.children(p)[0];

        // All records land in one batch; the later ones name a released image
        doc.set_attribute(img, "alt", "🌈").unwrap();
        doc.set_attribute(img, "class", "emoji").unwrap();
        doc.set_attribute(img, "alt", "🌈 rainbow").unwrap();

        assert_eq!(watcher.deliver(&mut doc), 1);
        assert_eq!(count(&doc, "span.native-emoji-replaced"), 1);
    }
}
