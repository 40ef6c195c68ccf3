//! Style snapshot copied from an emoji image onto its replacement

use emoji_dom::css::format_px;
use emoji_dom::{ComputedStyle, Display};

/// Ratio between an image's pixel height and the font size filling it
pub const FONT_SCALE: f32 = 0.75;

/// Font size used when the image height is unusable (inherit the container's)
pub const FALLBACK_FONT_SIZE: &str = "1em";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplacementStyle {
    pub font_size: String,
    pub line_height: String,
    pub display: &'static str,
    pub vertical_align: String,
    pub margin: String,
    pub padding: String,
}

impl ReplacementStyle {
    pub fn from_computed(computed: &ComputedStyle) -> Self {
        let height = computed.rendered_height();
        let vertical_align = if computed.vertical_align.is_empty() {
            "baseline".to_string()
        } else {
            computed.vertical_align.clone()
        };

        Self {
            font_size: font_size_for_height(height),
            line_height: format_px(height),
            display: if computed.display == Display::Block {
                "block"
            } else {
                "inline-block"
            },
            vertical_align,
            margin: computed.margin(),
            padding: computed.padding(),
        }
    }

    /// Style for an image outside the document
    ///
    /// Nothing cascades there: only the height is known, and the box edges
    /// are left unset.
    pub fn unresolved(height: f32) -> Self {
        Self {
            font_size: font_size_for_height(height),
            line_height: format_px(height),
            display: "inline-block",
            vertical_align: "baseline".to_string(),
            margin: String::new(),
            padding: String::new(),
        }
    }

    /// Inline style properties in the order they are written; empty values
    /// are skipped
    pub fn declarations(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("font-size", self.font_size.as_str()),
            ("line-height", self.line_height.as_str()),
            ("display", self.display),
            ("vertical-align", self.vertical_align.as_str()),
            ("margin", self.margin.as_str()),
            ("padding", self.padding.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
    }
}

/// `round(height × 0.75)px` for positive heights, the fallback otherwise
pub fn font_size_for_height(height: f32) -> String {
    if height.is_finite() && height > 0.0 {
        format_px((height * FONT_SCALE).round())
    } else {
        FALLBACK_FONT_SIZE.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_size_for_height() {
        assert_eq!(font_size_for_height(32.0), "24px");
        assert_eq!(font_size_for_height(22.0), "17px");
        assert_eq!(font_size_for_height(0.0), "1em");
        assert_eq!(font_size_for_height(-8.0), "1em");
        assert_eq!(font_size_for_height(f32::NAN), "1em");
    }

    #[test]
    fn test_from_computed() {
        let mut computed = ComputedStyle::initial("img");
        computed.height = Some(32.0);
        computed.vertical_align = "middle".into();

        let style = ReplacementStyle::from_computed(&computed);
        assert_eq!(style.font_size, "24px");
        assert_eq!(style.line_height, "32px");
        assert_eq!(style.display, "inline-block");
        assert_eq!(style.vertical_align, "middle");
        assert_eq!(style.margin, "0px");
        assert_eq!(style.padding, "0px");
    }

    #[test]
    fn test_block_images_stay_block() {
        let mut computed = ComputedStyle::initial("img");
        computed.display = Display::Block;
        assert_eq!(ReplacementStyle::from_computed(&computed).display, "block");

        computed.display = Display::Flex;
        assert_eq!(ReplacementStyle::from_computed(&computed).display, "inline-block");
    }

    #[test]
    fn test_zero_height_falls_back() {
        let computed = ComputedStyle::initial("img");
        let style = ReplacementStyle::from_computed(&computed);

        assert_eq!(style.font_size, "1em");
        assert_eq!(style.line_height, "0px");
    }

    #[test]
    fn test_unresolved_style_has_no_edges() {
        let style = ReplacementStyle::unresolved(32.0);
        let declarations: Vec<_> = style.declarations().collect();

        assert_eq!(
            declarations,
            [
                ("font-size", "24px"),
                ("line-height", "32px"),
                ("display", "inline-block"),
                ("vertical-align", "baseline"),
            ]
        );
    }
}
