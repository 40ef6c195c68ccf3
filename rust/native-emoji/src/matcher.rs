//! Emoji sequence matching

use std::sync::LazyLock;

use regex::Regex;

/// Extended-Pictographic code points, zero-width joiners and VS16
static EMOJI_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\p{Extended_Pictographic}|\x{200D}|\x{FE0F})+")
        .expect("emoji sequence regex is valid")
});

/// First contiguous emoji run in `text`, code points untouched
pub fn first_emoji_sequence(text: &str) -> Option<&str> {
    EMOJI_SEQUENCE.find(text).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_emoji_from_description() {
        assert_eq!(first_emoji_sequence("grinning face 😀"), Some("😀"));
        assert_eq!(first_emoji_sequence("😀 at start"), Some("😀"));
    }

    #[test]
    fn test_no_pictographs() {
        assert_eq!(first_emoji_sequence("smile"), None);
        assert_eq!(first_emoji_sequence(":smile:"), None);
        assert_eq!(first_emoji_sequence(""), None);
    }

    #[test]
    fn test_joined_sequences_stay_whole() {
        let family = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
        assert_eq!(first_emoji_sequence(&format!("family {family}")), Some(family));

        let heart = "\u{2764}\u{FE0F}";
        assert_eq!(first_emoji_sequence(heart), Some(heart));
    }

    #[test]
    fn test_only_first_run_is_used() {
        assert_eq!(first_emoji_sequence("😀🎉 party"), Some("😀🎉"));
        assert_eq!(first_emoji_sequence("😀 and 🎉"), Some("😀"));
    }
}
