//! URL handling module for Seedcrawl
//!
//! This module provides href resolution against a page URL and the
//! cache-busting step applied to every outgoing fetch.

mod cache_bust;
mod normalize;

// Re-export main functions
pub use cache_bust::{cache_bust, cache_bust_now, strip_cache_buster, CACHE_BUST_PARAM};
pub use normalize::normalize;
