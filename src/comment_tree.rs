//! Reconstructs reply threads from a flat, oldest-first comment list.
//!
//! Roots and siblings keep input order. A comment whose parent is not in the
//! input is an orphan and is left out, together with anything beneath it.
//! Parent cycles never reach a root, so they are left out the same way.
//! Nesting is rendered down to [`MAX_RENDER_DEPTH`]; deeper replies are
//! listed flat under the comment at that level.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{Comment, CommentThread};
use crate::score::ScoreTone;

/// Replies are offered while a comment's rendered level is below this.
pub const MAX_REPLY_DEPTH: usize = 3;

/// Deepest level rendered as nested `replies`. Anything below it is listed
/// flat, in input order, under the comment at this level.
pub const MAX_RENDER_DEPTH: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct CommentTree {
    comments: Vec<Comment>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl CommentTree {
    pub fn build(comments: Vec<Comment>) -> Self {
        let index: HashMap<Uuid, usize> = comments
            .iter()
            .enumerate()
            .map(|(position, comment)| (comment.id, position))
            .collect();

        let mut children = vec![Vec::new(); comments.len()];
        let mut roots = Vec::new();

        for (position, comment) in comments.iter().enumerate() {
            match comment.parent_id {
                None => roots.push(position),
                Some(parent_id) => match index.get(&parent_id) {
                    Some(&parent) => children[parent].push(position),
                    None => {
                        tracing::debug!(comment_id = %comment.id, %parent_id, "Dropping orphan comment");
                    }
                },
            }
        }

        Self {
            comments,
            children,
            roots,
        }
    }

    /// Root comments in input order. Each call starts a fresh traversal.
    pub fn roots(&self) -> impl Iterator<Item = CommentNode<'_>> + '_ {
        self.roots.iter().map(move |&index| CommentNode {
            tree: self,
            index,
            level: 0,
        })
    }

    /// Number of comments given to `build`, orphans included.
    pub fn total(&self) -> usize {
        self.comments.len()
    }

    /// Number of comments reachable from a root.
    pub fn reachable(&self) -> usize {
        self.roots().map(|root| root.subtree_size()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn threads(&self) -> Vec<CommentThread> {
        self.roots().map(|root| root.to_thread()).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CommentNode<'a> {
    tree: &'a CommentTree,
    index: usize,
    level: usize,
}

impl<'a> CommentNode<'a> {
    pub fn comment(&self) -> &'a Comment {
        &self.tree.comments[self.index]
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn can_reply(&self) -> bool {
        self.level < MAX_REPLY_DEPTH
    }

    pub fn children(&self) -> impl Iterator<Item = CommentNode<'a>> + 'a {
        let tree = self.tree;
        let level = self.level + 1;
        tree.children[self.index]
            .iter()
            .map(move |&index| CommentNode { tree, index, level })
    }

    /// Every comment beneath this one, in input order. Iterative, so chain
    /// length is not bounded by the call stack.
    fn descendants(&self) -> Vec<usize> {
        let mut found = Vec::new();
        let mut stack: Vec<usize> = self.tree.children[self.index].clone();
        while let Some(index) = stack.pop() {
            found.push(index);
            stack.extend(&self.tree.children[index]);
        }
        found.sort_unstable();
        found
    }

    fn subtree_size(&self) -> usize {
        1 + self.descendants().len()
    }

    fn thread(comment: &Comment, level: usize, replies: Vec<CommentThread>) -> CommentThread {
        let comment = comment.clone();
        let score = crate::score::score(comment.upvotes, comment.downvotes);
        let score_tone = ScoreTone::of(score);
        CommentThread {
            comment,
            score,
            score_tone,
            score_class: score_tone.css_class(),
            level,
            can_reply: level < MAX_REPLY_DEPTH,
            replies,
        }
    }

    pub fn to_thread(&self) -> CommentThread {
        let replies = if self.level < MAX_RENDER_DEPTH {
            self.children().map(|child| child.to_thread()).collect()
        } else {
            self.descendants()
                .into_iter()
                .map(|index| {
                    Self::thread(&self.tree.comments[index], self.level + 1, Vec::new())
                })
                .collect()
        };
        Self::thread(self.comment(), self.level, replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommentStatus;
    use chrono::{Duration, TimeZone, Utc};

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn comment(id: Uuid, parent_id: Option<Uuid>, order: i64) -> Comment {
        Comment {
            id,
            post_id: Uuid::nil(),
            parent_id,
            content: format!("comment {}", order),
            author_id: "device".to_string(),
            author_name: "Calm Panda".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 9, 8, 12, 0, 0).unwrap()
                + Duration::seconds(order),
            upvotes: 0,
            downvotes: 0,
            depth: 0,
            status: CommentStatus::Active,
        }
    }

    fn child_ids(node: &CommentNode<'_>) -> Vec<Uuid> {
        node.children().map(|child| child.comment().id).collect()
    }

    #[test]
    fn chain_is_nested_and_orphan_dropped() {
        let id = ids(3);
        let tree = CommentTree::build(vec![
            comment(id[0], None, 0),
            comment(id[1], Some(id[0]), 1),
            comment(id[2], Some(id[1]), 2),
            comment(Uuid::new_v4(), Some(Uuid::new_v4()), 3),
        ]);

        let roots: Vec<_> = tree.roots().collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].comment().id, id[0]);

        let b: Vec<_> = roots[0].children().collect();
        assert_eq!(child_ids(&roots[0]), vec![id[1]]);
        assert_eq!(child_ids(&b[0]), vec![id[2]]);
        assert_eq!(tree.reachable(), 3);
    }

    #[test]
    fn siblings_keep_input_order() {
        let id = ids(5);
        let tree = CommentTree::build(vec![
            comment(id[0], None, 0),
            comment(id[1], None, 1),
            comment(id[2], Some(id[0]), 2),
            comment(id[3], Some(id[1]), 3),
            comment(id[4], Some(id[0]), 4),
        ]);

        let roots: Vec<_> = tree.roots().collect();
        assert_eq!(
            roots.iter().map(|root| root.comment().id).collect::<Vec<_>>(),
            vec![id[0], id[1]]
        );
        assert_eq!(child_ids(&roots[0]), vec![id[2], id[4]]);
        assert_eq!(child_ids(&roots[1]), vec![id[3]]);
    }

    #[test]
    fn traversal_is_restartable() {
        let id = ids(2);
        let tree = CommentTree::build(vec![comment(id[0], None, 0), comment(id[1], None, 1)]);

        let first: Vec<_> = tree.roots().map(|node| node.comment().id).collect();
        let second: Vec<_> = tree.roots().map(|node| node.comment().id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn replies_stop_at_max_depth_but_comments_render() {
        let id = ids(5);
        let tree = CommentTree::build(vec![
            comment(id[0], None, 0),
            comment(id[1], Some(id[0]), 1),
            comment(id[2], Some(id[1]), 2),
            comment(id[3], Some(id[2]), 3),
            comment(id[4], Some(id[3]), 4),
        ]);

        let threads = tree.threads();
        let mut node = &threads[0];
        let mut levels = vec![(node.level, node.can_reply)];
        while let Some(reply) = node.replies.first() {
            node = reply;
            levels.push((node.level, node.can_reply));
        }

        assert_eq!(
            levels,
            vec![(0, true), (1, true), (2, true), (3, false), (4, false)]
        );
    }

    #[test]
    fn cycles_and_descendants_of_orphans_are_dropped() {
        let id = ids(4);
        let tree = CommentTree::build(vec![
            comment(id[0], Some(id[1]), 0),
            comment(id[1], Some(id[0]), 1),
            comment(id[2], Some(Uuid::new_v4()), 2),
            comment(id[3], Some(id[2]), 3),
        ]);

        assert!(tree.is_empty());
        assert_eq!(tree.reachable(), 0);
    }

    #[test]
    fn replies_listed_before_parent_still_attach() {
        let id = ids(2);
        let tree = CommentTree::build(vec![comment(id[1], Some(id[0]), 1), comment(id[0], None, 0)]);

        let roots: Vec<_> = tree.roots().collect();
        assert_eq!(child_ids(&roots[0]), vec![id[1]]);
    }

    #[test]
    fn long_reply_chain_renders_with_bounded_nesting() {
        let id = ids(6000);
        let comments = id
            .iter()
            .enumerate()
            .map(|(i, &comment_id)| {
                let parent = i.checked_sub(1).map(|p| id[p]);
                comment(comment_id, parent, i as i64)
            })
            .collect();
        let tree = CommentTree::build(comments);

        assert_eq!(tree.reachable(), 6000);

        let threads = tree.threads();
        let mut node = &threads[0];
        while node.level < MAX_RENDER_DEPTH {
            assert_eq!(node.replies.len(), 1);
            node = &node.replies[0];
        }

        assert_eq!(node.comment.id, id[MAX_RENDER_DEPTH]);
        assert_eq!(node.replies.len(), 6000 - MAX_RENDER_DEPTH - 1);
        assert_eq!(node.replies[0].comment.id, id[MAX_RENDER_DEPTH + 1]);
        assert_eq!(node.replies.last().unwrap().comment.id, id[5999]);
        assert!(node.replies.iter().all(|reply| {
            reply.replies.is_empty() && !reply.can_reply && reply.level == MAX_RENDER_DEPTH + 1
        }));

        let json = serde_json::to_string(&threads).unwrap();
        assert!(json.contains(&id[5999].to_string()));
    }

    #[test]
    fn thread_json_reports_rendered_level_and_stored_depth() {
        let id = ids(5);
        let mut chain: Vec<Comment> = Vec::new();
        for (i, &comment_id) in id.iter().enumerate() {
            let parent = i.checked_sub(1).map(|p| id[p]);
            let mut reply = comment(comment_id, parent, i as i64);
            reply.depth = (i as u32).min(3);
            chain.push(reply);
        }

        let threads = CommentTree::build(chain).threads();
        let deepest = &threads[0].replies[0].replies[0].replies[0].replies[0];
        let json = serde_json::to_value(deepest).unwrap();

        assert_eq!(json["level"], 4);
        assert_eq!(json["depth"], 3);
        assert_eq!(json["canReply"], false);
        assert_eq!(json["scoreClass"], "score-neutral");
        assert_eq!(json["scoreTone"], "neutral");
    }

    #[test]
    fn threads_carry_scores() {
        let id = ids(1);
        let mut downvoted = comment(id[0], None, 0);
        downvoted.upvotes = 1;
        downvoted.downvotes = 4;

        let threads = CommentTree::build(vec![downvoted]).threads();
        assert_eq!(threads[0].score, -3);
        assert_eq!(threads[0].score_tone, ScoreTone::Negative);
        assert_eq!(threads[0].score_class, "score-negative");
    }
}
