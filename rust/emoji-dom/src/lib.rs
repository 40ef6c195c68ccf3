//! Emoji DOM - in-memory HTML document for the native emoji replacer
//!
//! This crate provides:
//! - An arena-backed document tree with DOM-style mutation operations
//! - HTML parsing using html5ever
//! - Simple selector matching and stylesheet cascade using cssparser
//! - Mutation observer registrations with batched record delivery
//! - HTML serialization

pub mod error;
pub mod dom;
pub mod mutation;
pub mod selector;
pub mod css;
pub mod html_parser;
pub mod serialize;

pub use error::DomError;
pub use dom::{Attribute, Document, ElementData, Node, NodeData, NodeId};
pub use mutation::{MutationKind, MutationRecord, ObserverId, ObserverInit};
pub use selector::{Compound, Selector, SelectorList, Specificity};
pub use css::{ComputedStyle, Declaration, Display, Edges};
pub use html_parser::parse_html;
