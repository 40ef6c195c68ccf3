//! Page startup and the per-turn delivery loop

use emoji_dom::{parse_html, Document};

use crate::scan::scan;
use crate::watcher::Watcher;

/// Scan the whole document, then install the watcher
///
/// A failed install is logged and leaves the page usable with whatever
/// images the scan could not reach left in place.
pub fn start(document: &mut Document) -> Option<Watcher> {
    let replaced = scan(document, None);
    log::debug!("startup scan replaced {} image(s)", replaced);

    let mut watcher = Watcher::new();
    match watcher.install(document) {
        Ok(()) => Some(watcher),
        Err(err) => {
            log::error!("failed to initialize native emoji replacement: {}", err);
            None
        }
    }
}

/// A loaded document together with its watcher
pub struct Page {
    document: Document,
    watcher: Option<Watcher>,
}

impl Page {
    /// Parse `html` and start replacing
    pub fn load(html: &str) -> Self {
        Self::from_document(parse_html(html))
    }

    pub fn from_document(mut document: Document) -> Self {
        let watcher = start(&mut document);
        Self { document, watcher }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for host-side edits; they are picked up on [`Page::flush`]
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn watcher(&self) -> Option<&Watcher> {
        self.watcher.as_ref()
    }

    /// Deliver one pending batch. Returns the replacements made.
    pub fn flush(&mut self) -> usize {
        match &self.watcher {
            Some(watcher) => watcher.deliver(&mut self.document),
            None => 0,
        }
    }

    /// Deliver batches until one makes no replacement
    ///
    /// That batch is drained without queueing anything new, so the watcher's
    /// queue is empty afterwards.
    pub fn run_until_idle(&mut self) -> usize {
        let mut replaced = 0;
        loop {
            let batch = self.flush();
            if batch == 0 {
                return replaced;
            }
            replaced += batch;
        }
    }

    /// Tear the page down; later edits are no longer watched
    pub fn unload(&mut self) {
        self.document.unload();
        self.watcher = None;
    }

    pub fn to_html(&self) -> String {
        self.document.to_html()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emoji_dom::SelectorList;

    #[test]
    fn test_load_scans_then_watches() {
        let mut page = Page::load(r#"<main><img class="emoji" alt="😀"></main>"#);
        assert!(page.watcher().is_some_and(Watcher::is_installed));
        assert_eq!(page.document().text_content(page.document().root()), "😀");

        // The startup scan happens before install, so nothing is queued
        assert!(!page.document().has_pending_records());
        assert_eq!(page.flush(), 0);

        let main = page.document().children(page.document().root())[0];
        let img = page.document_mut().create_element("img");
        let doc = page.document_mut();
        doc.set_attribute(img, "class", "emoji").unwrap();
        doc.set_attribute(img, "alt", "🎉").unwrap();
        doc.append_child(main, img).unwrap();

        assert_eq!(page.run_until_idle(), 1);
        assert!(!page.document().has_pending_records());
        assert_eq!(page.document().text_content(main), "😀🎉");
    }

    #[test]
    fn test_start_on_unloaded_document() {
        let mut document = parse_html(r#"<img class="emoji" alt="😀">"#);
        document.unload();

        assert!(start(&mut document).is_none());
        // The startup scan still ran
        let images = SelectorList::parse("img").unwrap();
        assert_eq!(document.query_selector(document.root(), &images), None);
    }

    #[test]
    fn test_failed_start_leaves_page_usable() {
        let mut document = parse_html("<main></main>");
        document.unload();
        let mut page = Page::from_document(document);
        assert!(page.watcher().is_none());

        let main = page.document().children(page.document().root())[0];
        page.document_mut()
            .set_inner_html(main, r#"<img class="emoji" alt="😀">"#)
            .unwrap();
        assert_eq!(page.run_until_idle(), 0);
        assert!(page.to_html().contains("<img"));
    }

    #[test]
    fn test_unload_stops_watching() {
        let mut page = Page::load("<main></main>");
        page.unload();
        assert!(page.watcher().is_none());

        let main = page.document().children(page.document().root())[0];
        page.document_mut()
            .set_inner_html(main, r#"<img class="emoji" alt="😀">"#)
            .unwrap();
        assert_eq!(page.run_until_idle(), 0);
        assert_eq!(page.to_html(), r#"<main><img class="emoji" alt="😀"></main>"#);
    }
}
