//! Threaded blog comments and the tree nodes built from them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{Identifiable, Timestamped};

/// Deepest level that still accepts replies; roots sit at depth 1.
pub const MAX_REPLY_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    #[default]
    Approved,
    Rejected,
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub user_id: String,
    pub display_name: String,
}

/// Row stored in the `blog_comments` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author: AuthorRef,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        post_id: Uuid,
        author: AuthorRef,
        content: impl Into<String>,
        parent_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            author,
            content: content.into(),
            parent_id,
            like_count: 0,
            is_pinned: false,
            status: ModerationStatus::Approved,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.author.user_id == user_id
    }
}

impl Identifiable for Comment {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Timestamped for Comment {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Row stored in the `comment_likes` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentLike {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// A comment placed in a thread, annotated for the current viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNode {
    pub comment: Comment,
    pub liked_by_viewer: bool,
    pub depth: usize,
    pub can_reply: bool,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn new(comment: Comment, liked_by_viewer: bool, depth: usize) -> Self {
        Self {
            comment,
            liked_by_viewer,
            depth,
            can_reply: depth < MAX_REPLY_DEPTH,
            replies: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.comment.id
    }

    /// Number of nodes in this subtree, the node itself included.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .replies
            .iter()
            .map(CommentNode::subtree_len)
            .sum::<usize>()
    }
}
