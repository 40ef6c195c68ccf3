//! Arena-backed document tree
//!
//! Nodes live in a slot vector and are addressed by generational
//! [`NodeId`]s: a 1-indexed slot (0 = none) plus the slot's generation.
//! Releasing a detached subtree frees its slots for reuse and bumps their
//! generation, so ids held past a release resolve to nothing. Every
//! structural or attribute change is reported to the observer registry so
//! registered observers can drain it as a batch.

use std::fmt;

use markup5ever::LocalName;

use crate::css::StylesheetCache;
use crate::error::DomError;
use crate::mutation::{MutationRecord, ObserverRegistry};

/// Node handle: 1-indexed slot (0 = invalid/none) and slot generation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    slot: u32,
    generation: u32,
}

impl NodeId {
    pub const NONE: NodeId = NodeId {
        slot: 0,
        generation: 0,
    };

    pub fn is_valid(self) -> bool {
        self.slot != 0
    }

    fn index(self) -> usize {
        self.slot as usize - 1
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.slot)
        } else {
            write!(f, "#{}v{}", self.slot, self.generation)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: LocalName,
    pub value: String,
}

/// Tag name and attributes of an element node
#[derive(Clone, Debug)]
pub struct ElementData {
    pub name: LocalName,
    pub attrs: Vec<Attribute>,
}

impl ElementData {
    pub fn new(name: LocalName, attrs: Vec<Attribute>) -> Self {
        Self { name, attrs }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| &*a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Whitespace-separated tokens of the `class` attribute
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn is(&self, tag: &str) -> bool {
        &*self.name == tag
    }
}

#[derive(Clone, Debug)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub data: NodeData,
    parent: NodeId,
    children: Vec<NodeId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent.is_valid().then_some(self.parent)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A live HTML document
pub struct Document {
    slots: Vec<Slot>,
    /// Released slot numbers, reused before the vector grows
    free: Vec<u32>,
    pub(crate) observers: ObserverRegistry,
    pub(crate) stylesheet: StylesheetCache,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the document node
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node::new(NodeData::Document)),
            }],
            free: Vec::new(),
            observers: ObserverRegistry::default(),
            stylesheet: StylesheetCache::default(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId {
            slot: 1,
            generation: 0,
        }
    }

    /// Number of live nodes, the document node included
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Number of allocated slots, live or free
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        if !id.is_valid() {
            return None;
        }
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if !id.is_valid() {
            return None;
        }
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let node = Some(Node::new(data));
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize - 1];
            entry.node = node;
            return NodeId {
                slot,
                generation: entry.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node,
        });
        NodeId {
            slot: self.slots.len() as u32,
            generation: 0,
        }
    }

    fn set_parent(&mut self, child: NodeId, parent: NodeId) {
        if let Some(node) = self.node_mut(child) {
            node.parent = parent;
        }
    }

    fn children_mut(&mut self, parent: NodeId) -> Result<&mut Vec<NodeId>, DomError> {
        self.node_mut(parent)
            .map(|node| &mut node.children)
            .ok_or(DomError::NotFound(parent))
    }

    /// Free a parentless node together with its subtree
    ///
    /// The freed ids go stale: lookups through them find nothing and their
    /// slots are handed to later nodes. Returns how many nodes were freed.
    pub fn release(&mut self, id: NodeId) -> Result<usize, DomError> {
        if self.node(id).is_none() {
            return Err(DomError::NotFound(id));
        }
        if id == self.root() || self.parent(id).is_some() {
            return Err(DomError::Attached(id));
        }

        let mut doomed = self.descendants(id);
        doomed.push(id);
        for node in &doomed {
            let slot = &mut self.slots[node.index()];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node.slot);
        }
        Ok(doomed.len())
    }

    // ------------------------------------------------------------------
    // Node creation
    // ------------------------------------------------------------------

    /// Create a detached element; the tag name is ASCII-lowercased
    pub fn create_element(&mut self, name: &str) -> NodeId {
        let name = LocalName::from(name.to_ascii_lowercase());
        self.push_node(NodeData::Element(ElementData::new(name, Vec::new())))
    }

    pub(crate) fn create_element_with_attrs(
        &mut self,
        name: LocalName,
        attrs: Vec<Attribute>,
    ) -> NodeId {
        self.push_node(NodeData::Element(ElementData::new(name, attrs)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push_node(NodeData::Comment(text.to_string()))
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or_default()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&c| c == id)?;
        siblings.get(index + 1).copied()
    }

    /// Descendants of `id` in document (pre-)order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// `id` followed by its parent chain up to the topmost ancestor
    pub fn inclusive_ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.node(id).map(|_| id);
        while let Some(node) = current {
            chain.push(node);
            current = self.parent(node);
        }
        chain
    }

    /// Whether `node` is `ancestor` or one of its descendants
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inclusive_ancestors(node).contains(&ancestor)
    }

    /// Whether the node is reachable from the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.inclusive_ancestors(id).last() == Some(&self.root())
    }

    // ------------------------------------------------------------------
    // Element access
    // ------------------------------------------------------------------

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.node(id).and_then(Node::as_element)
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match self.node_mut(id) {
            Some(Node {
                data: NodeData::Element(element),
                ..
            }) => Ok(element),
            Some(_) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::NotFound(id)),
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Explicit type test for `<img>` elements
    pub fn is_image(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|e| e.is("img"))
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| &*e.name)
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attr(name))
    }

    /// Set (or overwrite) an attribute; the name is ASCII-lowercased
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let element = self.element_mut(id)?;
        match element.attrs.iter_mut().find(|a| *a.name == *name) {
            Some(attr) => attr.value = value.to_string(),
            None => element.attrs.push(Attribute {
                name: LocalName::from(name.as_str()),
                value: value.to_string(),
            }),
        }
        self.record_mutation(MutationRecord::attribute(id, &name));
        Ok(())
    }

    /// Remove an attribute, returning whether it was present
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<bool, DomError> {
        let name = name.to_ascii_lowercase();
        let element = self.element_mut(id)?;
        let before = element.attrs.len();
        element.attrs.retain(|a| *a.name != *name);
        let removed = element.attrs.len() != before;
        if removed {
            self.record_mutation(MutationRecord::attribute(id, &name));
        }
        Ok(removed)
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    /// Append a class token unless it is already present
    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        let element = self.element(id).ok_or_else(|| self.not_element_error(id))?;
        if element.has_class(class) {
            return Ok(());
        }
        let mut tokens: Vec<&str> = element.classes().collect();
        tokens.push(class);
        let value = tokens.join(" ");
        self.set_attribute(id, "class", &value)
    }

    fn not_element_error(&self, id: NodeId) -> DomError {
        if self.node(id).is_some() {
            DomError::NotAnElement(id)
        } else {
            DomError::NotFound(id)
        }
    }

    /// Concatenated text of the node and its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Text(text)) | Some(NodeData::Comment(text)) => text.clone(),
            Some(_) => self
                .descendants(id)
                .into_iter()
                .filter_map(|d| match &self.node(d)?.data {
                    NodeData::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    /// Replace all children with a single text node (none for empty text)
    ///
    /// The previous children are released.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        match self.node_mut(id) {
            Some(Node {
                data: NodeData::Text(data) | NodeData::Comment(data),
                ..
            }) => {
                *data = text.to_string();
                self.note_character_data(id);
                return Ok(());
            }
            Some(_) => {}
            None => return Err(DomError::NotFound(id)),
        }

        let removed = std::mem::take(self.children_mut(id)?);
        for &child in &removed {
            self.set_parent(child, NodeId::NONE);
        }
        let mut added = Vec::new();
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.set_parent(text_node, id);
            self.children_mut(id)?.push(text_node);
            added.push(text_node);
        }
        if removed.is_empty() && added.is_empty() {
            return Ok(());
        }
        self.record_mutation(MutationRecord::child_list(id, added, removed.clone()));
        for child in removed {
            self.release(child)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tree mutation
    // ------------------------------------------------------------------

    fn ensure_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_node = self.node(parent).ok_or(DomError::NotFound(parent))?;
        let child_node = self.node(child).ok_or(DomError::NotFound(child))?;
        let parent_ok = matches!(parent_node.data, NodeData::Document | NodeData::Element(_));
        let child_ok = !matches!(child_node.data, NodeData::Document);
        if !parent_ok || !child_ok || self.contains(child, parent) {
            return Err(DomError::Hierarchy { parent, child });
        }
        Ok(())
    }

    /// Unlink a node from its parent, recording the removal
    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if let Ok(siblings) = self.children_mut(parent) {
            siblings.retain(|&c| c != child);
        }
        self.set_parent(child, NodeId::NONE);
        self.record_mutation(MutationRecord::child_list(parent, Vec::new(), vec![child]));
    }

    /// Insert `child` before `reference` (or at the end when `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.ensure_insertable(parent, child)?;
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotFound(reference));
            }
        }
        let reference = if reference == Some(child) {
            self.next_sibling(child)
        } else {
            reference
        };

        self.detach(child);
        let siblings = self.children_mut(parent)?;
        let index = reference
            .and_then(|r| siblings.iter().position(|&c| c == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
        self.set_parent(child, parent);
        self.record_mutation(MutationRecord::child_list(parent, vec![child], Vec::new()));
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Detach a node from its parent (no-op for parentless nodes)
    ///
    /// The node stays allocated so it can be reinserted; see [`Document::release`].
    pub fn remove(&mut self, child: NodeId) {
        self.detach(child);
    }

    /// Put `new` into the exact slot of `old`, detaching `old`
    ///
    /// Returns `Ok(false)` without touching the tree when `old` has no
    /// parent. The swap is reported as a single child-list record.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) -> Result<bool, DomError> {
        if self.node(old).is_none() {
            return Err(DomError::NotFound(old));
        }
        let Some(parent) = self.parent(old) else {
            return Ok(false);
        };
        if old == new {
            return Ok(true);
        }
        self.ensure_insertable(parent, new)?;

        self.detach(new);
        let siblings = self.children_mut(parent)?;
        let Some(index) = siblings.iter().position(|&c| c == old) else {
            return Ok(false);
        };
        siblings[index] = new;
        self.set_parent(new, parent);
        self.set_parent(old, NodeId::NONE);
        self.record_mutation(MutationRecord::child_list(parent, vec![new], vec![old]));
        Ok(true)
    }

    fn record_mutation(&mut self, record: MutationRecord) {
        self.note_style_mutation(&record);
        if !self.observers.is_observing() {
            return;
        }
        let chain = self.inclusive_ancestors(record.target);
        self.observers.enqueue(record, &chain);
    }
}
