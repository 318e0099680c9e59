//! Per-view navigation history
//!
//! A bounded back/forward stack of visited pages. Pushing a page while
//! positioned in the middle of the stack drops the forward branch, like
//! every browser. History is in-memory only.

mod entry;
mod stack;

pub use entry::{HistoryEntry, Viewport};
pub use stack::HistoryStack;
