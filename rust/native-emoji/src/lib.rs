//! Native Emoji - swaps emoji images for natively rendered emoji text
//!
//! This crate provides:
//! - The matcher/replacer turning `<img class="emoji" alt="😀">` into an
//!   inline `<span>` styled to occupy the image's box
//! - The scan driver and the mutation watcher keeping a live document
//!   replaced as content arrives
//! - Page startup wiring (scan, then install the watcher)
//! - A C ABI (`ffi`) for embedding in a browser host

pub mod error;
pub mod matcher;
pub mod style;
pub mod replacer;
pub mod scan;
pub mod watcher;
pub mod page;
pub mod ffi;

pub use error::NativeEmojiError;
pub use matcher::first_emoji_sequence;
pub use style::ReplacementStyle;
pub use replacer::{try_replace, Replacement, Skip};
pub use scan::scan;
pub use watcher::{Watcher, WatcherState};
pub use page::{start, Page};

/// Class identifying an image as an emoji glyph
pub const EMOJI_CLASS: &str = "emoji";
/// Idempotency marker carried by every replacement element
pub const REPLACED_MARKER: &str = "native-emoji-replaced";
/// Styling hook carried by every replacement element
pub const REPLACEMENT_CLASS: &str = "native-emoji-replacement";
/// Attributes whose changes can make an image eligible
pub const OBSERVED_ATTRIBUTES: [&str; 2] = ["alt", "class"];
