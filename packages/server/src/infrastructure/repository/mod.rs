//! Comment list storage backends.

pub mod file;
pub mod inmemory;

pub use file::FileCommentListStore;
pub use inmemory::InMemoryCommentListStore;
