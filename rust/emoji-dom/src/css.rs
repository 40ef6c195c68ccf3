//! CSS parsing and computed style using cssparser
//!
//! Provides:
//! - Inline `style` attribute parsing and serialization
//! - Stylesheet parsing for `<style>` elements
//! - Length parsing (px, %, em, rem, pt, mm, auto)
//! - A small cascade (UA defaults < presentational hints < stylesheets by
//!   specificity and source order < inline style) yielding [`ComputedStyle`]

use std::cell::OnceCell;

use cssparser::{Parser, ParserInput, Token as CssToken};

use crate::dom::{Document, ElementData, NodeData, NodeId};
use crate::error::DomError;
use crate::mutation::MutationRecord;
use crate::selector::{SelectorList, Specificity};

/// Base font size used to resolve `em`/`rem`
pub const BASE_FONT_SIZE: f32 = 16.0;

/// Length value
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Length {
    Auto,
    Px(f32),
    Percent(f32),
}

impl Length {
    /// Resolve to px; with no layout, `auto` and percentages resolve to 0
    pub fn to_px(self) -> f32 {
        match self {
            Length::Px(px) => px,
            Length::Auto | Length::Percent(_) => 0.0,
        }
    }
}

/// Parse a CSS length value
pub fn parse_length(value: &str) -> Option<Length> {
    let value = value.trim().to_ascii_lowercase();

    if value == "auto" {
        return Some(Length::Auto);
    }

    if let Some(num) = value.strip_suffix('%') {
        return num.trim().parse::<f32>().ok().map(Length::Percent);
    }

    let units: [(&str, f32); 6] = [
        ("px", 1.0),
        ("rem", BASE_FONT_SIZE),
        ("em", BASE_FONT_SIZE),
        ("pt", 4.0 / 3.0),
        ("mm", 3.779_527_6),
        ("", 1.0),
    ];
    for (suffix, scale) in units {
        if let Some(num) = value.strip_suffix(suffix) {
            if let Ok(num) = num.parse::<f32>() {
                if num.is_finite() {
                    return Some(Length::Px(num * scale));
                }
            }
        }
    }
    None
}

/// Format a pixel value the way computed styles report it (`24px`, `0.5px`)
pub fn format_px(value: f32) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{}px", value)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Display {
    None,
    Inline,
    Block,
    InlineBlock,
    ListItem,
    Flex,
    InlineFlex,
    Grid,
    InlineGrid,
    Table,
    Contents,
}

impl Display {
    pub fn parse(value: &str) -> Option<Self> {
        let display = match value.trim().to_ascii_lowercase().as_str() {
            "none" => Display::None,
            "inline" => Display::Inline,
            "block" => Display::Block,
            "inline-block" => Display::InlineBlock,
            "list-item" => Display::ListItem,
            "flex" => Display::Flex,
            "inline-flex" => Display::InlineFlex,
            "grid" => Display::Grid,
            "inline-grid" => Display::InlineGrid,
            "table" => Display::Table,
            "contents" => Display::Contents,
            _ => return None,
        };
        Some(display)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Display::None => "none",
            Display::Inline => "inline",
            Display::Block => "block",
            Display::InlineBlock => "inline-block",
            Display::ListItem => "list-item",
            Display::Flex => "flex",
            Display::InlineFlex => "inline-flex",
            Display::Grid => "grid",
            Display::InlineGrid => "inline-grid",
            Display::Table => "table",
            Display::Contents => "contents",
        }
    }
}

/// Box edges in px (margin, padding)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn all(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Shortest shorthand serialization (`0px`, `1px 2px`, ...)
    pub fn to_css(&self) -> String {
        let (t, r, b, l) = (
            format_px(self.top),
            format_px(self.right),
            format_px(self.bottom),
            format_px(self.left),
        );
        if l == r {
            if t == b {
                if t == r {
                    t
                } else {
                    format!("{t} {r}")
                }
            } else {
                format!("{t} {r} {b}")
            }
        } else {
            format!("{t} {r} {b} {l}")
        }
    }
}

/// Parse margin/padding shorthand (1-4 values) into edges
fn parse_edges_shorthand(val: &str) -> Option<Edges> {
    let values: Vec<f32> = val
        .split_whitespace()
        .map(|p| parse_length(p).map(|l| l.to_px()))
        .collect::<Option<_>>()?;

    let (top, right, bottom, left) = match values[..] {
        [a] => (a, a, a, a),
        [a, b] => (a, b, a, b),
        [a, b, c] => (a, b, c, b),
        [a, b, c, d] => (a, b, c, d),
        _ => return None,
    };
    Some(Edges {
        top,
        right,
        bottom,
        left,
    })
}

const VERTICAL_ALIGN_KEYWORDS: [&str; 8] = [
    "baseline",
    "sub",
    "super",
    "text-top",
    "text-bottom",
    "middle",
    "top",
    "bottom",
];

/// Computed values of the properties the replacer reads
#[derive(Clone, Debug, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub vertical_align: String,
    pub margin: Edges,
    pub padding: Edges,
    /// Used height in px; `None` when `auto`
    pub height: Option<f32>,
}

impl ComputedStyle {
    /// User-agent defaults for a tag
    pub fn initial(tag: &str) -> Self {
        let display = match tag {
            "address" | "article" | "aside" | "blockquote" | "body" | "dd" | "div" | "dl"
            | "dt" | "fieldset" | "figcaption" | "figure" | "footer" | "form" | "h1" | "h2"
            | "h3" | "h4" | "h5" | "h6" | "header" | "hr" | "html" | "main" | "nav" | "ol"
            | "p" | "pre" | "section" | "ul" => Display::Block,
            "li" => Display::ListItem,
            "table" => Display::Table,
            "head" | "link" | "meta" | "script" | "style" | "template" | "title" => {
                Display::None
            }
            _ => Display::Inline,
        };
        let margin = match tag {
            "body" => Edges::all(8.0),
            "p" => Edges {
                top: BASE_FONT_SIZE,
                bottom: BASE_FONT_SIZE,
                ..Edges::default()
            },
            _ => Edges::default(),
        };
        Self {
            display,
            vertical_align: "baseline".to_string(),
            margin,
            padding: Edges::default(),
            height: None,
        }
    }

    pub fn margin(&self) -> String {
        self.margin.to_css()
    }

    pub fn padding(&self) -> String {
        self.padding.to_css()
    }

    /// Rendered height in whole px (0 when nothing determines it)
    pub fn rendered_height(&self) -> f32 {
        self.height.map_or(0.0, whole_px)
    }

    /// Apply one declaration; invalid values are ignored
    pub fn apply(&mut self, decl: &Declaration) {
        let val = decl.value.as_str();

        match decl.name.as_str() {
            "display" => {
                if let Some(display) = Display::parse(val) {
                    self.display = display;
                }
            }

            "vertical-align" => {
                let lower = val.trim().to_ascii_lowercase();
                if VERTICAL_ALIGN_KEYWORDS.contains(&lower.as_str()) {
                    self.vertical_align = lower;
                } else {
                    match parse_length(&lower) {
                        Some(Length::Px(px)) => self.vertical_align = format_px(px),
                        Some(Length::Percent(_)) => self.vertical_align = lower,
                        _ => {}
                    }
                }
            }

            "margin" => {
                if let Some(edges) = parse_edges_shorthand(val) {
                    self.margin = edges;
                }
            }

            "padding" => {
                if let Some(edges) = parse_edges_shorthand(val) {
                    if [edges.top, edges.right, edges.bottom, edges.left]
                        .iter()
                        .all(|v| *v >= 0.0)
                    {
                        self.padding = edges;
                    }
                }
            }

            "margin-top" | "margin-right" | "margin-bottom" | "margin-left" | "padding-top"
            | "padding-right" | "padding-bottom" | "padding-left" => {
                let Some(px) = parse_length(val).map(|l| l.to_px()) else {
                    return;
                };
                let (edges, side) = match decl.name.split_once('-') {
                    Some(("margin", side)) => (&mut self.margin, side),
                    Some((_, side)) if px >= 0.0 => (&mut self.padding, side),
                    _ => return,
                };
                match side {
                    "top" => edges.top = px,
                    "right" => edges.right = px,
                    "bottom" => edges.bottom = px,
                    _ => edges.left = px,
                }
            }

            "height" => match parse_length(val) {
                Some(Length::Auto) | Some(Length::Percent(_)) => self.height = None,
                Some(Length::Px(px)) if px >= 0.0 => self.height = Some(px),
                _ => {}
            },

            _ => {}
        }
    }
}

/// One `name: value` declaration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
}

impl Declaration {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.trim().to_ascii_lowercase(),
            value: value.trim().to_string(),
        }
    }
}

/// Parse a declaration block (inline `style` attribute or rule body)
pub fn parse_declarations(style_str: &str) -> Vec<Declaration> {
    let mut out = Vec::new();

    for decl in style_str.split(';') {
        let decl = decl.trim();
        if decl.is_empty() {
            continue;
        }

        if let Some((prop, val)) = decl.split_once(':') {
            let val = val.trim();
            let val = val.strip_suffix("!important").unwrap_or(val);
            if prop.trim().is_empty() || val.trim().is_empty() {
                continue;
            }
            out.push(Declaration::new(prop, val));
        }
    }

    out
}

pub fn serialize_declarations(decls: &[Declaration]) -> String {
    decls
        .iter()
        .map(|d| format!("{}: {};", d.name, d.value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Style rule from a stylesheet
#[derive(Clone, Debug)]
pub struct StyleRule {
    pub selectors: SelectorList,
    pub declarations: Vec<Declaration>,
}

/// Parse a CSS stylesheet into rules, skipping unsupported ones
pub fn parse_stylesheet(css: &str) -> Vec<StyleRule> {
    let mut rules = Vec::new();
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);

    while !parser.is_exhausted() {
        match parse_rule(&mut parser) {
            Some((prelude, body)) => match SelectorList::parse(prelude) {
                Ok(selectors) => rules.push(StyleRule {
                    selectors,
                    declarations: parse_declarations(body),
                }),
                Err(err) => log::debug!("skipping style rule: {}", err),
            },
            None => break,
        }
    }

    rules
}

/// Read one `prelude { body }` rule, returning both as source slices
fn parse_rule<'i>(parser: &mut Parser<'i, '_>) -> Option<(&'i str, &'i str)> {
    let start = parser.position();
    loop {
        match parser.next_including_whitespace() {
            Ok(CssToken::CurlyBracketBlock) => break,
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    let prelude = parser.slice_from(start).trim_end_matches('{').trim();

    let body = parser
        .parse_nested_block(|block| {
            let start = block.position();
            while block.next_including_whitespace().is_ok() {}
            Ok::<_, cssparser::ParseError<'i, ()>>(block.slice_from(start))
        })
        .ok()?;

    Some((prelude, body))
}

/// Truncate to a whole, non-negative pixel count like `HTMLImageElement.height`
fn whole_px(px: f32) -> f32 {
    px.max(0.0).trunc()
}

/// Height given by an `<img height>` attribute
fn height_hint(element: &ElementData) -> Option<f32> {
    if !element.is("img") {
        return None;
    }
    element.attr("height").and_then(parse_dimension_attribute)
}

/// Parsed rules of the connected `<style>` elements
///
/// Built on first use and dropped when a mutation touches a `<style>`
/// element or its text.
#[derive(Default)]
pub(crate) struct StylesheetCache {
    rules: OnceCell<Vec<StyleRule>>,
}

impl StylesheetCache {
    fn is_built(&self) -> bool {
        self.rules.get().is_some()
    }

    fn invalidate(&mut self) {
        if self.rules.take().is_some() {
            log::trace!("stylesheet cache invalidated");
        }
    }
}

/// Parse an HTML dimension attribute (`32`, `32.5`, `32px` → 32)
fn parse_dimension_attribute(value: &str) -> Option<f32> {
    let value = value.trim_start();
    let end = value
        .char_indices()
        .find(|&(_, c)| !(c.is_ascii_digit() || c == '.'))
        .map_or(value.len(), |(i, _)| i);
    let number = &value[..end];
    if number.is_empty() || value[end..].starts_with('%') {
        return None;
    }
    number.parse::<f32>().ok()
}

impl Document {
    /// Rules of every connected `<style>` element, in document order
    pub fn stylesheet_rules(&self) -> &[StyleRule] {
        self.stylesheet.rules.get_or_init(|| self.collect_stylesheet_rules())
    }

    fn collect_stylesheet_rules(&self) -> Vec<StyleRule> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.element(id).is_some_and(|e| e.is("style")))
            .flat_map(|id| parse_stylesheet(&self.text_content(id)))
            .collect()
    }

    /// Resolve the computed style of a connected element
    pub fn computed_style(&self, id: NodeId) -> Result<ComputedStyle, DomError> {
        let element = match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element(element)) => element,
            Some(_) => return Err(DomError::NotAnElement(id)),
            None => return Err(DomError::NotFound(id)),
        };
        if !self.is_connected(id) {
            return Err(DomError::Detached(id));
        }

        let mut style = ComputedStyle::initial(&element.name);
        if let Some(height) = height_hint(element) {
            style.height = Some(height);
        }

        let rules = self.stylesheet_rules();
        let mut matched: Vec<(Specificity, usize)> = rules
            .iter()
            .enumerate()
            .filter_map(|(i, rule)| rule.selectors.match_specificity(self, id).map(|s| (s, i)))
            .collect();
        matched.sort();
        for (_, i) in matched {
            for decl in &rules[i].declarations {
                style.apply(decl);
            }
        }

        if let Some(inline) = element.attr("style") {
            for decl in parse_declarations(inline) {
                style.apply(&decl);
            }
        }

        Ok(style)
    }

    /// Rendered height in whole px
    ///
    /// Outside the document there is no cascade, so only the `<img height>`
    /// attribute counts.
    pub fn rendered_height(&self, id: NodeId) -> Result<f32, DomError> {
        match self.computed_style(id) {
            Ok(style) => Ok(style.rendered_height()),
            Err(DomError::Detached(_)) => {
                let element = self.element(id).ok_or(DomError::NotAnElement(id))?;
                Ok(height_hint(element).map_or(0.0, whole_px))
            }
            Err(err) => Err(err),
        }
    }

    /// Drop cached rules when `record` touches a `<style>` element
    pub(crate) fn note_style_mutation(&mut self, record: &MutationRecord) {
        if !self.stylesheet.is_built() {
            return;
        }
        let touches_style = self.is_in_style(record.target)
            || record
                .added_nodes
                .iter()
                .chain(&record.removed_nodes)
                .any(|&node| self.subtree_has_style(node));
        if touches_style {
            self.stylesheet.invalidate();
        }
    }

    /// Drop cached rules when the text of a `<style>` element changed in place
    pub(crate) fn note_character_data(&mut self, text: NodeId) {
        if self.stylesheet.is_built() && self.is_in_style(text) {
            self.stylesheet.invalidate();
        }
    }

    fn is_style(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|e| e.is("style"))
    }

    fn is_in_style(&self, id: NodeId) -> bool {
        self.inclusive_ancestors(id).into_iter().any(|n| self.is_style(n))
    }

    fn subtree_has_style(&self, id: NodeId) -> bool {
        self.is_style(id) || self.descendants(id).into_iter().any(|n| self.is_style(n))
    }

    /// Value of a property in the element's inline style
    pub fn style_property(&self, id: NodeId, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        parse_declarations(self.get_attribute(id, "style")?)
            .into_iter()
            .rev()
            .find(|d| d.name == name)
            .map(|d| d.value)
    }

    /// Set a property in the element's inline style
    pub fn set_style_property(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let mut decls = parse_declarations(self.get_attribute(id, "style").unwrap_or_default());
        let decl = Declaration::new(name, value);
        decls.retain(|d| d.name != decl.name);
        decls.push(decl);
        self.set_attribute(id, "style", &serialize_declarations(&decls))
    }
}
