//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageState`: Tracks the state of individual pages (pending, fetching, extracting, processed, skipped)

mod page_state;

// Re-export main types
pub use page_state::PageState;
