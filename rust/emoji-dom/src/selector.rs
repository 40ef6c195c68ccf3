//! Simple selectors using cssparser
//!
//! Supports type, universal, `.class` and `#id` selectors, `:not(...)` with a
//! compound argument, the descendant combinator and comma-separated lists.
//! That covers the queries the replacer issues and the stylesheets it reads.

use cssparser::{ParseError, Parser, ParserInput, Token as CssToken};

use crate::dom::{Document, ElementData, NodeId};
use crate::error::DomError;

/// (id, class, type) specificity triple
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl std::ops::Add for Specificity {
    type Output = Specificity;

    fn add(self, rhs: Self) -> Self {
        Specificity(self.0 + rhs.0, self.1 + rhs.1, self.2 + rhs.2)
    }
}

/// A sequence of simple selectors that must all match one element
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    negations: Vec<Compound>,
}

impl Compound {
    /// Universal compound (`*`)
    pub fn any() -> Self {
        Self::default()
    }

    pub fn tag(name: &str) -> Self {
        Self {
            tag: Some(name.to_ascii_lowercase()),
            ..Self::default()
        }
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn not(mut self, negated: Compound) -> Self {
        self.negations.push(negated);
        self
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches_element(&self, element: &ElementData) -> bool {
        if let Some(tag) = &self.tag {
            if !element.is(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| element.has_class(c))
            && !self.negations.iter().any(|n| n.matches_element(element))
    }

    pub fn specificity(&self) -> Specificity {
        let own = Specificity(
            self.id.is_some() as u32,
            self.classes.len() as u32,
            self.tag.is_some() as u32,
        );
        self.negations
            .iter()
            .fold(own, |acc, n| acc + n.specificity())
    }
}

/// Compounds joined by descendant combinators; the last one is the subject
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Compound>,
}

impl Selector {
    pub fn specificity(&self) -> Specificity {
        self.compounds
            .iter()
            .fold(Specificity::default(), |acc, c| acc + c.specificity())
    }

    fn matches(&self, document: &Document, id: NodeId) -> bool {
        let Some((subject, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        let Some(element) = document.element(id) else {
            return false;
        };
        if !subject.matches_element(element) {
            return false;
        }

        // Descendant combinators only, so matching each compound against the
        // nearest qualifying ancestor is sufficient.
        let mut remaining = ancestors.iter().rev().peekable();
        let mut current = document.parent(id);
        while let Some(wanted) = remaining.peek() {
            let Some(node) = current else {
                return false;
            };
            if document
                .element(node)
                .is_some_and(|e| wanted.matches_element(e))
            {
                remaining.next();
            }
            current = document.parent(node);
        }
        true
    }
}

/// Comma-separated list of selectors
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Selector>,
}

impl From<Compound> for SelectorList {
    fn from(compound: Compound) -> Self {
        Self {
            selectors: vec![Selector {
                compounds: vec![compound],
            }],
        }
    }
}

impl SelectorList {
    /// Parse a selector list such as `img.emoji:not(.done), .x img`
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let invalid = || DomError::InvalidSelector(source.to_string());
        let mut input = ParserInput::new(source.trim());
        let mut parser = Parser::new(&mut input);

        let mut selectors = Vec::new();
        let mut selector = Selector::default();
        let mut compound = Compound::any();
        let mut in_compound = false;

        loop {
            let token = match parser.next_including_whitespace() {
                Ok(token) => token.clone(),
                Err(_) => break,
            };
            match token {
                CssToken::WhiteSpace(_) => {
                    if in_compound {
                        selector.compounds.push(std::mem::take(&mut compound));
                        in_compound = false;
                    }
                }
                CssToken::Comma => {
                    if in_compound {
                        selector.compounds.push(std::mem::take(&mut compound));
                        in_compound = false;
                    }
                    if selector.compounds.is_empty() {
                        return Err(invalid());
                    }
                    selectors.push(std::mem::take(&mut selector));
                }
                other => {
                    parse_simple(&mut parser, &other, &mut compound).map_err(|()| invalid())?;
                    in_compound = true;
                }
            }
        }

        if in_compound {
            selector.compounds.push(compound);
        }
        if selector.compounds.is_empty() {
            return Err(invalid());
        }
        selectors.push(selector);
        Ok(Self { selectors })
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    /// Highest specificity among the selectors matching `id`
    pub fn match_specificity(&self, document: &Document, id: NodeId) -> Option<Specificity> {
        self.selectors
            .iter()
            .filter(|s| s.matches(document, id))
            .map(Selector::specificity)
            .max()
    }
}

/// Apply one simple selector starting at `token` to `compound`
fn parse_simple<'i>(
    parser: &mut Parser<'i, '_>,
    token: &CssToken<'i>,
    compound: &mut Compound,
) -> Result<(), ()> {
    match token {
        CssToken::Ident(name) => {
            if !compound.is_empty() {
                return Err(());
            }
            compound.tag = Some(name.to_ascii_lowercase());
        }
        CssToken::Delim('*') => {
            if !compound.is_empty() {
                return Err(());
            }
        }
        CssToken::IDHash(id) => compound.id = Some(id.to_string()),
        CssToken::Delim('.') => match parser.next_including_whitespace() {
            Ok(CssToken::Ident(class)) => compound.classes.push(class.to_string()),
            _ => return Err(()),
        },
        CssToken::Colon => {
            match parser.next_including_whitespace() {
                Ok(CssToken::Function(name)) if name.eq_ignore_ascii_case("not") => {}
                _ => return Err(()),
            }
            let negated = parser
                .parse_nested_block(|nested| parse_negation(nested))
                .map_err(|_: ParseError<'i, ()>| ())?;
            compound.negations.push(negated);
        }
        _ => return Err(()),
    }
    Ok(())
}

fn parse_negation<'i>(parser: &mut Parser<'i, '_>) -> Result<Compound, ParseError<'i, ()>> {
    let mut compound = Compound::any();
    let mut seen = false;
    loop {
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        parse_simple(parser, &token, &mut compound).map_err(|()| parser.new_custom_error(()))?;
        seen = true;
    }
    if !seen {
        return Err(parser.new_custom_error(()));
    }
    Ok(compound)
}

impl Document {
    pub fn matches(&self, id: NodeId, selectors: &SelectorList) -> bool {
        selectors.match_specificity(self, id).is_some()
    }

    /// Matching descendants of `root` (excluding `root`) in document order
    pub fn query_selector_all(&self, root: NodeId, selectors: &SelectorList) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| self.matches(id, selectors))
            .collect()
    }

    pub fn query_selector(&self, root: NodeId, selectors: &SelectorList) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&id| self.matches(id, selectors))
    }
}
