//! Builds and patches the nested view of a comment thread.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use ekami_domain::{Comment, CommentNode, MAX_REPLY_DEPTH};

use crate::CoreError;

/// Nests a flat comment list into reply trees.
///
/// Parentless comments become roots, ordered pinned-first and otherwise in
/// input order. Replies keep input order. A comment whose parent is not in
/// `comments` is dropped together with everything beneath it.
pub fn build_comment_tree(comments: &[Comment], liked_ids: &HashSet<Uuid>) -> Vec<CommentNode> {
    let mut children: HashMap<Uuid, Vec<&Comment>> = HashMap::new();
    let mut roots: Vec<&Comment> = Vec::new();
    for comment in comments {
        match comment.parent_id {
            Some(parent_id) => children.entry(parent_id).or_default().push(comment),
            None => roots.push(comment),
        }
    }
    roots.sort_by_key(|comment| !comment.is_pinned);

    roots
        .into_iter()
        .map(|root| attach(root, 1, &children, liked_ids))
        .collect()
}

fn attach(
    comment: &Comment,
    depth: usize,
    children: &HashMap<Uuid, Vec<&Comment>>,
    liked_ids: &HashSet<Uuid>,
) -> CommentNode {
    let mut node = CommentNode::new(comment.clone(), liked_ids.contains(&comment.id), depth);
    if let Some(replies) = children.get(&comment.id) {
        node.replies = replies
            .iter()
            .filter(|reply| reply.id != comment.id)
            .map(|reply| attach(reply, depth + 1, children, liked_ids))
            .collect();
    }
    node
}

/// A built thread that can be patched in place after each mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentTree {
    roots: Vec<CommentNode>,
    arrival: HashMap<Uuid, usize>,
    next_arrival: usize,
}

impl CommentTree {
    pub fn build(comments: &[Comment], liked_ids: &HashSet<Uuid>) -> Self {
        let mut tree = Self {
            roots: build_comment_tree(comments, liked_ids),
            ..Self::default()
        };
        for comment in comments.iter().filter(|comment| comment.is_root()) {
            tree.record_arrival(comment.id);
        }
        tree
    }

    pub fn roots(&self) -> &[CommentNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of comments shown, replies included.
    pub fn len(&self) -> usize {
        self.roots.iter().map(CommentNode::subtree_len).sum()
    }

    pub fn find(&self, id: Uuid) -> Option<&CommentNode> {
        find_in(&self.roots, id)
    }

    /// Adds a freshly created comment where a full rebuild would place it.
    pub fn insert(&mut self, comment: Comment, liked_by_viewer: bool) -> Result<(), CoreError> {
        match comment.parent_id {
            None => {
                self.record_arrival(comment.id);
                self.roots
                    .push(CommentNode::new(comment, liked_by_viewer, 1));
                self.sort_roots();
                Ok(())
            }
            Some(parent_id) => {
                let parent = find_in_mut(&mut self.roots, parent_id)
                    .ok_or_else(|| CoreError::not_found("blog_comments", parent_id))?;
                if !parent.can_reply {
                    return Err(CoreError::InvalidOperation(format!(
                        "Replies are limited to {MAX_REPLY_DEPTH} levels"
                    )));
                }
                let depth = parent.depth + 1;
                parent
                    .replies
                    .push(CommentNode::new(comment, liked_by_viewer, depth));
                Ok(())
            }
        }
    }

    /// Returns false when the comment is not part of the tree.
    pub fn update_content(&mut self, id: Uuid, content: &str, updated_at: DateTime<Utc>) -> bool {
        match find_in_mut(&mut self.roots, id) {
            Some(node) => {
                node.comment.content = content.to_string();
                node.comment.updated_at = updated_at;
                true
            }
            None => false,
        }
    }

    pub fn set_pinned(&mut self, id: Uuid, pinned: bool) -> bool {
        match find_in_mut(&mut self.roots, id) {
            Some(node) => {
                node.comment.is_pinned = pinned;
                self.sort_roots();
                true
            }
            None => false,
        }
    }

    pub fn apply_like(&mut self, id: Uuid, liked_by_viewer: bool, like_count: u32) -> bool {
        match find_in_mut(&mut self.roots, id) {
            Some(node) => {
                node.liked_by_viewer = liked_by_viewer;
                node.comment.like_count = like_count;
                true
            }
            None => false,
        }
    }

    /// Detaches a comment and its whole reply subtree.
    pub fn remove(&mut self, id: Uuid) -> Option<CommentNode> {
        if let Some(index) = self.roots.iter().position(|node| node.id() == id) {
            self.arrival.remove(&id);
            return Some(self.roots.remove(index));
        }
        remove_from(&mut self.roots, id)
    }

    /// Depth-first walk yielding `(depth, node)` pairs in display order.
    pub fn walk(&self) -> Vec<(usize, &CommentNode)> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<&CommentNode> = self.roots.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push((node.depth, node));
            stack.extend(node.replies.iter().rev());
        }
        out
    }

    fn record_arrival(&mut self, id: Uuid) {
        self.arrival.insert(id, self.next_arrival);
        self.next_arrival += 1;
    }

    fn sort_roots(&mut self) {
        let arrival = &self.arrival;
        self.roots.sort_by_key(|node| {
            (
                !node.comment.is_pinned,
                arrival.get(&node.id()).copied().unwrap_or(usize::MAX),
            )
        });
    }
}

fn find_in(nodes: &[CommentNode], id: Uuid) -> Option<&CommentNode> {
    for node in nodes {
        if node.id() == id {
            return Some(node);
        }
        if let Some(found) = find_in(&node.replies, id) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut(nodes: &mut [CommentNode], id: Uuid) -> Option<&mut CommentNode> {
    for node in nodes.iter_mut() {
        if node.id() == id {
            return Some(node);
        }
        if let Some(found) = find_in_mut(&mut node.replies, id) {
            return Some(found);
        }
    }
    None
}

fn remove_from(nodes: &mut Vec<CommentNode>, id: Uuid) -> Option<CommentNode> {
    for node in nodes.iter_mut() {
        if let Some(index) = node.replies.iter().position(|reply| reply.id() == id) {
            return Some(node.replies.remove(index));
        }
        if let Some(removed) = remove_from(&mut node.replies, id) {
            return Some(removed);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use ekami_domain::AuthorRef;

    use super::*;

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn comment(content: &str, parent: Option<Uuid>, minute: i64) -> Comment {
        let author = AuthorRef {
            user_id: "u-1".into(),
            display_name: "Ada".into(),
        };
        Comment::new(Uuid::new_v4(), author, content, parent, at(minute))
    }

    fn pinned(mut comment: Comment) -> Comment {
        comment.is_pinned = true;
        comment
    }

    fn contents(nodes: &[CommentNode]) -> Vec<&str> {
        nodes.iter().map(|node| node.comment.content.as_str()).collect()
    }

    #[test]
    fn pinned_roots_come_first_and_keep_relative_order() {
        let a = comment("A", None, 0);
        let b = pinned(comment("B", None, 1));
        let c = comment("C", None, 2);

        let tree = build_comment_tree(&[a, b, c], &HashSet::new());

        assert_eq!(contents(&tree), vec!["B", "A", "C"]);
    }

    #[test]
    fn replies_nest_under_parents_with_depth() {
        let root = comment("root", None, 0);
        let reply = comment("reply", Some(root.id), 1);
        let nested = comment("nested", Some(reply.id), 2);

        let tree = build_comment_tree(&[root, reply, nested], &HashSet::new());

        assert_eq!(tree.len(), 1);
        let reply_node = &tree[0].replies[0];
        assert_eq!(reply_node.depth, 2);
        assert!(tree[0].can_reply);
        assert!(!reply_node.can_reply);
        assert_eq!(reply_node.replies[0].comment.content, "nested");
    }

    #[test]
    fn orphans_and_their_descendants_are_dropped() {
        let root = comment("root", None, 0);
        let orphan = comment("orphan", Some(Uuid::new_v4()), 1);
        let orphan_child = comment("orphan child", Some(orphan.id), 2);

        let tree = build_comment_tree(&[root, orphan, orphan_child], &HashSet::new());

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].subtree_len(), 1);
    }

    #[test]
    fn building_twice_gives_the_same_tree() {
        let root = pinned(comment("root", None, 0));
        let reply = comment("reply", Some(root.id), 1);
        let other = comment("other", None, 2);
        let liked: HashSet<Uuid> = [reply.id].into_iter().collect();
        let input = vec![root, reply, other];

        let first = build_comment_tree(&input, &liked);
        let second = build_comment_tree(&input, &liked);

        assert_eq!(first, second);
        assert!(first[0].replies[0].liked_by_viewer);
        assert!(!first[0].liked_by_viewer);
    }

    #[test]
    fn incremental_insert_matches_full_rebuild() {
        let root = comment("root", None, 0);
        let second = comment("second", None, 1);
        let mut tree = CommentTree::build(&[root.clone(), second.clone()], &HashSet::new());

        let reply = comment("reply", Some(root.id), 2);
        let third = comment("third", None, 3);
        tree.insert(reply.clone(), false).unwrap();
        tree.insert(third.clone(), false).unwrap();

        let rebuilt = CommentTree::build(&[root, second, reply, third], &HashSet::new());
        assert_eq!(tree.roots(), rebuilt.roots());
    }

    #[test]
    fn insert_rejects_replies_past_max_depth() {
        let root = comment("root", None, 0);
        let reply = comment("reply", Some(root.id), 1);
        let mut tree = CommentTree::build(&[root, reply.clone()], &HashSet::new());

        let too_deep = comment("too deep", Some(reply.id), 2);
        let err = tree.insert(too_deep, false).unwrap_err();

        assert!(matches!(err, CoreError::InvalidOperation(_)));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn unpinning_restores_arrival_order() {
        let a = comment("A", None, 0);
        let b = comment("B", None, 1);
        let c = comment("C", None, 2);
        let mut tree = CommentTree::build(&[a, b, c.clone()], &HashSet::new());

        tree.set_pinned(c.id, true);
        assert_eq!(contents(tree.roots()), vec!["C", "A", "B"]);

        tree.set_pinned(c.id, false);
        assert_eq!(contents(tree.roots()), vec!["A", "B", "C"]);
    }

    #[test]
    fn remove_drops_the_whole_subtree() {
        let root = comment("root", None, 0);
        let reply = comment("reply", Some(root.id), 1);
        let keep = comment("keep", None, 2);
        let mut tree = CommentTree::build(&[root.clone(), reply.clone(), keep], &HashSet::new());

        let removed = tree.remove(root.id).unwrap();

        assert_eq!(removed.subtree_len(), 2);
        assert!(tree.find(reply.id).is_none());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn likes_and_edits_patch_single_nodes() {
        let root = comment("root", None, 0);
        let mut tree = CommentTree::build(&[root.clone()], &HashSet::new());

        assert!(tree.apply_like(root.id, true, 3));
        assert!(tree.update_content(root.id, "edited", at(5)));
        assert!(!tree.apply_like(Uuid::new_v4(), true, 1));

        let node = tree.find(root.id).unwrap();
        assert!(node.liked_by_viewer);
        assert_eq!(node.comment.like_count, 3);
        assert_eq!(node.comment.content, "edited");
        assert_eq!(node.comment.updated_at, at(5));
    }

    #[test]
    fn walk_yields_display_order() {
        let a = comment("A", None, 0);
        let a1 = comment("A1", Some(a.id), 1);
        let b = comment("B", None, 2);
        let tree = CommentTree::build(&[a, a1, b], &HashSet::new());

        let order: Vec<(usize, &str)> = tree
            .walk()
            .into_iter()
            .map(|(depth, node)| (depth, node.comment.content.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "A"), (2, "A1"), (1, "B")]);
    }
}
