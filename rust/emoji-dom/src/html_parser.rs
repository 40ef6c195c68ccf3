//! HTML Parser using html5ever
//!
//! Feeds the html5ever tokenizer and builds document nodes directly from the
//! token stream. Tree construction is deliberately simple: start tags open
//! elements, void and self-closing tags do not, and end tags close the
//! nearest open element with the same name. Character references are
//! decoded by the tokenizer.

use std::cell::RefCell;

use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use markup5ever::LocalName;
use tendril::StrTendril;

use crate::dom::{Attribute, Document, NodeData, NodeId};
use crate::error::DomError;

/// Elements that never have children
pub const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

fn raw_kind(name: &str) -> Option<RawKind> {
    match name {
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
        "script" => Some(RawKind::ScriptData),
        "textarea" | "title" => Some(RawKind::Rcdata),
        _ => None,
    }
}

/// Builder state shared with the token sink
struct BuildState {
    document: Document,
    /// Open elements; empty means "insert at the top level"
    open: Vec<NodeId>,
    /// Container receiving top-level nodes, or `None` to collect them
    container: Option<NodeId>,
    top_level: Vec<NodeId>,
}

impl BuildState {
    fn insert(&mut self, node: NodeId) {
        let parent = self.open.last().copied().or(self.container);
        match parent {
            Some(parent) => {
                if let Err(err) = self.document.append_child(parent, node) {
                    log::debug!("html: dropping node {}: {}", node, err);
                }
            }
            None => self.top_level.push(node),
        }
    }

    fn append_text(&mut self, text: &str) {
        // Merge with a preceding text sibling; the tokenizer splits runs
        let parent = self.open.last().copied().or(self.container);
        let last = match parent {
            Some(parent) => self.document.children(parent).last().copied(),
            None => self.top_level.last().copied(),
        };
        if let Some(last) = last {
            if let Some(NodeData::Text(existing)) = self.document.node(last).map(|n| &n.data) {
                let merged = format!("{existing}{text}");
                let _ = self.document.set_text_content(last, &merged);
                return;
            }
        }
        let node = self.document.create_text(text);
        self.insert(node);
    }
}

/// Wrapper to implement TokenSink trait
struct TreeSink<'a> {
    state: &'a RefCell<BuildState>,
}

impl TreeSink<'_> {
    fn process_tag(&self, tag: Tag) -> TokenSinkResult<()> {
        let mut state = self.state.borrow_mut();
        let name = LocalName::from(tag.name.to_ascii_lowercase());

        match tag.kind {
            TagKind::StartTag => {
                let attrs = tag
                    .attrs
                    .into_iter()
                    .map(|attr| Attribute {
                        name: LocalName::from(attr.name.local.to_ascii_lowercase()),
                        value: attr.value.to_string(),
                    })
                    .collect();
                let node = state.document.create_element_with_attrs(name.clone(), attrs);
                state.insert(node);

                if tag.self_closing || is_void_element(&name) {
                    return TokenSinkResult::Continue;
                }
                state.open.push(node);
                if let Some(kind) = raw_kind(&name) {
                    return TokenSinkResult::RawData(kind);
                }
            }
            TagKind::EndTag => {
                let document = &state.document;
                let position = state
                    .open
                    .iter()
                    .rposition(|&id| document.element(id).is_some_and(|e| e.name == name));
                if let Some(position) = position {
                    state.open.truncate(position);
                }
            }
        }
        TokenSinkResult::Continue
    }
}

impl TokenSink for TreeSink<'_> {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => return self.process_tag(tag),
            Token::CharacterTokens(text) => {
                self.state.borrow_mut().append_text(&text);
            }
            Token::CommentToken(comment) => {
                let mut state = self.state.borrow_mut();
                let node = state.document.create_comment(&comment);
                state.insert(node);
            }
            Token::ParseError(err) => {
                log::trace!("html: parse error: {}", err);
            }
            Token::DoctypeToken(_) | Token::NullCharacterToken | Token::EOFToken => {}
        }
        TokenSinkResult::Continue
    }
}

/// Run the tokenizer over `html`, building into `document`
fn build(document: Document, container: Option<NodeId>, html: &str) -> (Document, Vec<NodeId>) {
    let state = RefCell::new(BuildState {
        document,
        open: Vec::new(),
        container,
        top_level: Vec::new(),
    });

    {
        let sink = TreeSink { state: &state };
        let tok = Tokenizer::new(sink, TokenizerOpts::default());
        let mut buffer = BufferQueue::default();
        buffer.push_back(StrTendril::from(html));
        let _ = tok.feed(&mut buffer);
        tok.end();
    }

    let state = state.into_inner();
    (state.document, state.top_level)
}

/// Parse a full HTML document
pub fn parse_html(html: &str) -> Document {
    let document = Document::new();
    let root = document.root();
    build(document, Some(root), html).0
}

impl Document {
    /// Parse `html` into detached nodes owned by this document
    pub fn parse_fragment(&mut self, html: &str) -> Vec<NodeId> {
        let document = std::mem::take(self);
        let (document, nodes) = build(document, None, html);
        *self = document;
        nodes
    }

    /// Replace the children of `id` with the parsed `html`
    ///
    /// The old children are released. The new nodes are inserted one by
    /// one, like a script appending them.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<(), DomError> {
        if !self.is_element(id) && id != self.root() {
            return Err(DomError::NotAnElement(id));
        }
        for child in self.children(id).to_vec() {
            self.remove(child);
            self.release(child)?;
        }
        for node in self.parse_fragment(html) {
            self.append_child(id, node)?;
        }
        Ok(())
    }
}
