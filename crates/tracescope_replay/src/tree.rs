//! Call tree built from the frame registry.

use crate::state::Frame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracescope_core::FrameId;

/// Forest over frames, keyed by parent
///
/// A frame is a root if it has no parent, its parent was never
/// materialized, or its parent was materialized after it. Siblings are
/// ordered by ascending frame id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTree {
    roots: Vec<FrameId>,
    children: BTreeMap<FrameId, Vec<FrameId>>,
}

/// A frame visited during a depth-first walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeNode {
    /// Frame ID
    pub frame_id: FrameId,
    /// Nesting level in the tree (roots are 0)
    pub level: usize,
}

impl CallTree {
    /// Build the forest from a frame map
    #[must_use]
    pub fn build(frames: &BTreeMap<FrameId, Frame>) -> Self {
        let mut tree = Self::default();

        for frame in frames.values() {
            let parent = frame.parent_frame_id.filter(|parent| {
                *parent != frame.frame_id
                    && frames
                        .get(parent)
                        .is_some_and(|p| p.created_at <= frame.created_at)
            });

            match parent {
                Some(parent) => tree.children.entry(parent).or_default().push(frame.frame_id),
                None => {
                    if frame.parent_frame_id.is_some() {
                        tracing::trace!(frame = %frame.frame_id, "orphan frame promoted to root");
                    }
                    tree.roots.push(frame.frame_id);
                }
            }
        }

        tree
    }

    /// Root frame ids in ascending order
    #[must_use]
    pub fn roots(&self) -> &[FrameId] {
        &self.roots
    }

    /// Children of a frame in ascending order
    #[must_use]
    pub fn children(&self, frame_id: FrameId) -> &[FrameId] {
        self.children
            .get(&frame_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Parent to children index
    #[must_use]
    pub fn children_index(&self) -> &BTreeMap<FrameId, Vec<FrameId>> {
        &self.children
    }

    /// Number of frames in the forest
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len() + self.children.values().map(Vec::len).sum::<usize>()
    }

    /// Whether the forest is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Pre-order depth-first walk over the whole forest
    #[must_use]
    pub fn walk(&self) -> Vec<TreeNode> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<TreeNode> = self
            .roots
            .iter()
            .rev()
            .map(|&frame_id| TreeNode { frame_id, level: 0 })
            .collect();

        // Parents are always created strictly before their children, so
        // the parent relation cannot form a cycle.
        while let Some(node) = stack.pop() {
            out.push(node);
            for &child in self.children(node.frame_id).iter().rev() {
                stack.push(TreeNode {
                    frame_id: child,
                    level: node.level + 1,
                });
            }
        }

        out
    }
}
