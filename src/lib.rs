//! Telegram relay bot: remote text generation with a canned-reply fallback.

pub mod config;
pub mod relay;
pub mod replies;
pub mod util;
