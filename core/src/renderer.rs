//! The component-tree renderer collaborator contract.
//!
//! Mooring does not render anything itself. It hands an aggregate [`Node`]
//! tree to an external renderer capable of mounting a tree into a root,
//! portal-like multi-target rendering, and an optional synchronous-flush
//! mode. The manager owns exactly one root at a time and recreates it on
//! teardown.

use crate::tree::Node;

/// A component-tree renderer driving one shared render root.
pub trait TreeRenderer {
    /// The handle to a live render root bound to a container.
    type Root;

    /// Creates a fresh root.
    fn create_root(&mut self) -> Self::Root;

    /// Renders the aggregate tree into the root, batched.
    fn render(&mut self, root: &mut Self::Root, tree: Node);

    /// Renders the aggregate tree into the root, flushing synchronously.
    ///
    /// Renderers without a dedicated flush mode fall back to
    /// [`render`](Self::render).
    fn render_sync(&mut self, root: &mut Self::Root, tree: Node) {
        self.render(root, tree);
    }

    /// Tears down a root, detaching everything rendered into it.
    fn unmount_root(&mut self, root: Self::Root);
}
