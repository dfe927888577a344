use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use ekami_domain::{
    AuthorRef, Comment, CommentLike, Identity, ModerationStatus, Timestamped,
};

use super::tree::CommentTree;
use crate::store::{
    collections, from_record, from_records, to_record, Query, Record, RecordStore, SortOrder,
};
use crate::time::Clock;
use crate::CoreError;

/// Reads and mutates blog comment threads.
///
/// Every mutation performs its write against the store first and then patches
/// the caller's [`CommentTree`], so a thread never needs a full reload.
pub struct CommentService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    require_moderation: bool,
}

impl CommentService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            require_moderation: false,
        }
    }

    /// New comments start as pending and stay hidden until approved.
    pub fn with_moderation(mut self, require_moderation: bool) -> Self {
        self.require_moderation = require_moderation;
        self
    }

    /// Loads the approved comments of a post and the viewer's likes.
    pub fn load_thread(&self, post_id: Uuid, viewer: Option<&str>) -> Result<CommentTree, CoreError> {
        let query = Query::new()
            .eq("post_id", post_id.to_string())
            .eq("status", ModerationStatus::Approved.to_string())
            .order_by("created_at", SortOrder::Ascending);
        let comments: Vec<Comment> = from_records(self.store.select(collections::BLOG_COMMENTS, &query)?)?;

        let liked_ids = match viewer {
            Some(user_id) => self.liked_by(user_id)?,
            None => HashSet::new(),
        };
        tracing::debug!(%post_id, comments = comments.len(), "comment thread loaded");
        Ok(CommentTree::build(&comments, &liked_ids))
    }

    fn liked_by(&self, user_id: &str) -> Result<HashSet<Uuid>, CoreError> {
        let likes: Vec<CommentLike> = from_records(
            self.store
                .select(collections::COMMENT_LIKES, &Query::new().eq("user_id", user_id))?,
        )?;
        Ok(likes.into_iter().map(|like| like.comment_id).collect())
    }

    pub fn post(
        &self,
        tree: &mut CommentTree,
        post_id: Uuid,
        author: &Identity,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Comment, CoreError> {
        let content = require_content(content)?;
        if let Some(parent_id) = parent_id {
            let parent = tree
                .find(parent_id)
                .ok_or_else(|| CoreError::not_found(collections::BLOG_COMMENTS, parent_id))?;
            if !parent.can_reply {
                return Err(CoreError::InvalidOperation(
                    "This comment cannot receive more replies".into(),
                ));
            }
        }

        let mut comment = Comment::new(
            post_id,
            AuthorRef {
                user_id: author.user_id.clone(),
                display_name: author.display_name.clone(),
            },
            content,
            parent_id,
            self.clock.now(),
        );
        if self.require_moderation {
            comment.status = ModerationStatus::Pending;
        }
        self.store
            .insert(collections::BLOG_COMMENTS, to_record(&comment)?)?;
        tracing::info!(comment_id = %comment.id, %post_id, status = %comment.status, "comment posted");

        if comment.status == ModerationStatus::Approved {
            tree.insert(comment.clone(), false)?;
        }
        Ok(comment)
    }

    pub fn edit(
        &self,
        tree: &mut CommentTree,
        comment_id: Uuid,
        editor: &Identity,
        content: &str,
    ) -> Result<Comment, CoreError> {
        let content = require_content(content)?;
        let mut comment = self.load_comment(comment_id)?;
        if !comment.is_authored_by(&editor.user_id) {
            return Err(CoreError::Forbidden(
                "Only the author can edit this comment".into(),
            ));
        }
        comment.content = content;
        comment.touch(self.clock.now());
        self.store.update(
            collections::BLOG_COMMENTS,
            &comment_id.to_string(),
            to_record(&comment)?,
        )?;
        tree.update_content(comment_id, &comment.content, comment.updated_at);
        tracing::info!(%comment_id, "comment edited");
        Ok(comment)
    }

    /// Deletes the comment row; its replies become orphans and vanish from the tree.
    pub fn delete(
        &self,
        tree: &mut CommentTree,
        comment_id: Uuid,
        user: &Identity,
    ) -> Result<(), CoreError> {
        let comment = self.load_comment(comment_id)?;
        if !comment.is_authored_by(&user.user_id) {
            return Err(CoreError::Forbidden(
                "Only the author can delete this comment".into(),
            ));
        }
        self.store
            .delete(collections::BLOG_COMMENTS, &comment_id.to_string())?;
        tree.remove(comment_id);
        tracing::info!(%comment_id, "comment deleted");
        Ok(())
    }

    /// Likes the comment, or removes the like when one already exists.
    ///
    /// Returns whether the viewer likes the comment afterwards. The like row is
    /// the write; the cached counter on the comment is refreshed alongside it.
    /// When the counter cannot be saved the like row is put back as it was.
    pub fn toggle_like(
        &self,
        tree: &mut CommentTree,
        comment_id: Uuid,
        user: &Identity,
    ) -> Result<bool, CoreError> {
        let mut comment = self.load_comment(comment_id)?;
        let existing = self.store.select(
            collections::COMMENT_LIKES,
            &Query::new()
                .eq("comment_id", comment_id.to_string())
                .eq("user_id", user.user_id.as_str())
                .limit(1),
        )?;

        let change = match existing.into_iter().next() {
            Some(record) => {
                let like: CommentLike = from_record(record.clone())?;
                self.store
                    .delete(collections::COMMENT_LIKES, &like.id.to_string())?;
                comment.like_count = comment.like_count.saturating_sub(1);
                LikeChange::Removed(record)
            }
            None => {
                let like = CommentLike {
                    id: Uuid::new_v4(),
                    comment_id,
                    user_id: user.user_id.clone(),
                    created_at: self.clock.now(),
                };
                self.store
                    .insert(collections::COMMENT_LIKES, to_record(&like)?)?;
                comment.like_count = comment.like_count.saturating_add(1);
                LikeChange::Added(like.id)
            }
        };

        let saved = to_record(&comment).and_then(|record| {
            self.store
                .update(collections::BLOG_COMMENTS, &comment_id.to_string(), record)
        });
        if let Err(err) = saved {
            self.revert_like(&change);
            return Err(err);
        }

        let liked = matches!(change, LikeChange::Added(_));
        tree.apply_like(comment_id, liked, comment.like_count);
        tracing::debug!(%comment_id, liked, likes = comment.like_count, "comment like toggled");
        Ok(liked)
    }

    fn revert_like(&self, change: &LikeChange) {
        let reverted = match change {
            LikeChange::Added(like_id) => self
                .store
                .delete(collections::COMMENT_LIKES, &like_id.to_string())
                .map(|_| ()),
            LikeChange::Removed(record) => self
                .store
                .insert(collections::COMMENT_LIKES, record.clone())
                .map(|_| ()),
        };
        if let Err(err) = reverted {
            tracing::warn!(error = %err, "like row could not be reverted");
        }
    }

    /// Pins or unpins a top-level comment. Moderator action; no author check.
    pub fn set_pinned(
        &self,
        tree: &mut CommentTree,
        comment_id: Uuid,
        pinned: bool,
    ) -> Result<Comment, CoreError> {
        let mut comment = self.load_comment(comment_id)?;
        if !comment.is_root() {
            return Err(CoreError::InvalidOperation(
                "Only top-level comments can be pinned".into(),
            ));
        }
        comment.is_pinned = pinned;
        comment.touch(self.clock.now());
        self.store.update(
            collections::BLOG_COMMENTS,
            &comment_id.to_string(),
            to_record(&comment)?,
        )?;
        tree.set_pinned(comment_id, pinned);
        tracing::info!(%comment_id, pinned, "comment pin changed");
        Ok(comment)
    }

    fn load_comment(&self, comment_id: Uuid) -> Result<Comment, CoreError> {
        let record = self
            .store
            .get(collections::BLOG_COMMENTS, &comment_id.to_string())?
            .ok_or_else(|| CoreError::not_found(collections::BLOG_COMMENTS, comment_id))?;
        from_record(record)
    }
}

fn require_content(content: &str) -> Result<String, CoreError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        Err(CoreError::Validation("Comment cannot be empty".into()))
    } else {
        Ok(trimmed.to_string())
    }
}

enum LikeChange {
    Added(Uuid),
    Removed(Record),
}
