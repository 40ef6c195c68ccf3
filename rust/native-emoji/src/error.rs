//! Error type for the replacer and its startup

use emoji_dom::DomError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NativeEmojiError {
    #[error("watcher is already installed")]
    AlreadyInstalled,

    #[error(transparent)]
    Dom(#[from] DomError),
}
