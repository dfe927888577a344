//! Blog comment threads.

pub mod service;
pub mod tree;

pub use service::CommentService;
pub use tree::{build_comment_tree, CommentTree};
