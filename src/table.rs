use log::{debug, error};

use crate::error::EngineResult;
use crate::node::{InternalNodeCell, Node, INTERNAL_NODE_MAX_CELLS, INVALID_PAGE_NUM};
use crate::pager::Pager;

/// The tree, identified by its root page (always page 0). Owns the pager
/// and implements the parts of the B+-tree that live above a single node:
/// root growth and internal-node insert/split.
pub struct Table {
    pub root_page_num: u32,
    pub pager: Pager,
    closed: bool,
}

impl Table {
    pub fn db_open(filename: &str) -> EngineResult<Self> {
        let mut pager = Pager::open(filename)?;
        let root_page_num = 0;

        if pager.num_pages == 0 {
            let root = pager.get_page(root_page_num)?;
            root.set_node_root(true);
        }

        Ok(Self {
            root_page_num,
            pager,
            closed: false,
        })
    }

    pub fn db_close(&mut self) -> EngineResult<()> {
        if self.closed {
            return Ok(());
        }
        self.pager.close()?;
        self.closed = true;
        Ok(())
    }

    /// Splits the current root in two: the old root's contents move into a
    /// freshly allocated left child, the root page is reinitialized as an
    /// internal node with that left child plus the given right child, and
    /// both children are re-parented. The root's page number never changes.
    /// Returns the page number of the new left child.
    pub fn create_new_root(&mut self, right_child_page_num: u32) -> EngineResult<u32> {
        let root_page_num = self.root_page_num;
        let left_page_num = self.pager.allocate_page()?;
        debug!("root {root_page_num} splitting; new left child page {left_page_num}");

        let mut old_root = self.pager.get_page(root_page_num)?.clone();
        old_root.set_node_root(false);
        let old_root_was_internal = matches!(old_root, Node::Internal { .. });

        *self.pager.get_page(left_page_num)? = old_root;

        if old_root_was_internal {
            let left_page = self.pager.get_page(left_page_num)?;
            let num_keys = *left_page.internal_node_num_keys();
            let mut children = Vec::with_capacity(num_keys as usize + 1);
            for i in 0..num_keys {
                children.push(*left_page.internal_node_child(i));
            }
            children.push(*left_page.internal_node_right_child());

            for child_page_num in children {
                *self.pager.get_page(child_page_num)?.parent() = left_page_num;
            }
        }

        let left_max_key = self.pager.max_key(left_page_num)?;

        let root = self.pager.get_page(root_page_num)?;
        *root = Node::initialize_internal_node();
        root.set_node_root(true);
        *root.internal_node_num_keys() = 1;
        root.internal_node_cell(0).set(left_page_num, left_max_key);
        *root.internal_node_right_child() = right_child_page_num;

        *self.pager.get_page(left_page_num)?.parent() = root_page_num;
        *self.pager.get_page(right_child_page_num)?.parent() = root_page_num;

        Ok(left_page_num)
    }

    /// Inserts `child_page_num` as a child of `parent_page_num`, splitting
    /// the parent first if it is already full.
    pub fn internal_node_insert(
        &mut self,
        parent_page_num: u32,
        child_page_num: u32,
    ) -> EngineResult<()> {
        let child_max = self.pager.max_key(child_page_num)?;

        let parent = self.pager.get_page(parent_page_num)?;
        let index = parent.internal_node_find_child(child_max);
        let num_keys = *parent.internal_node_num_keys();

        if num_keys as usize == INTERNAL_NODE_MAX_CELLS {
            return self.internal_node_split_and_insert(parent_page_num, child_page_num);
        }

        let right_child_page_num = *parent.internal_node_right_child();
        if right_child_page_num == INVALID_PAGE_NUM {
            *parent.internal_node_right_child() = child_page_num;
            return Ok(());
        }

        let right_child_max = self.pager.max_key(right_child_page_num)?;

        let parent = self.pager.get_page(parent_page_num)?;
        *parent.internal_node_num_keys() = num_keys + 1;

        if child_max > right_child_max {
            parent
                .internal_node_cell(num_keys)
                .set(right_child_page_num, right_child_max);
            *parent.internal_node_right_child() = child_page_num;
        } else {
            let mut i = num_keys;
            while i > index {
                let prev =
                    std::mem::replace(parent.internal_node_cell(i - 1), InternalNodeCell::new());
                *parent.internal_node_cell(i) = prev;
                i -= 1;
            }
            parent.internal_node_cell(index).set(child_page_num, child_max);
        }

        Ok(())
    }

    /// Splits a full internal node and inserts `child_page_num` into
    /// whichever half it belongs in. Handles the root case by growing the
    /// tree first, then treats the (possibly relocated) old node uniformly.
    fn internal_node_split_and_insert(
        &mut self,
        old_page_num: u32,
        child_page_num: u32,
    ) -> EngineResult<()> {
        let old_max = self.pager.max_key(old_page_num)?;
        let root_splitting = self.pager.get_page(old_page_num)?.is_node_root();

        let new_page_num = self.pager.allocate_page()?;

        let old_page_num = if root_splitting {
            *self.pager.get_page(new_page_num)? = Node::initialize_internal_node();
            self.create_new_root(new_page_num)?
        } else {
            let parent_page_num = *self.pager.get_page(old_page_num)?.parent();
            let new_page = self.pager.get_page(new_page_num)?;
            *new_page = Node::initialize_internal_node();
            *new_page.parent() = parent_page_num;
            old_page_num
        };

        let old_right_child = *self.pager.get_page(old_page_num)?.internal_node_right_child();
        self.internal_node_insert(new_page_num, old_right_child)?;
        *self.pager.get_page(old_right_child)?.parent() = new_page_num;
        *self.pager.get_page(old_page_num)?.internal_node_right_child() = INVALID_PAGE_NUM;

        let lower_bound = (INTERNAL_NODE_MAX_CELLS as u32 / 2) + 1;
        let mut i = (INTERNAL_NODE_MAX_CELLS - 1) as u32;
        while i >= lower_bound {
            let moving_child = *self.pager.get_page(old_page_num)?.internal_node_child(i);
            self.internal_node_insert(new_page_num, moving_child)?;
            *self.pager.get_page(moving_child)?.parent() = new_page_num;
            *self.pager.get_page(old_page_num)?.internal_node_num_keys() -= 1;

            if i == 0 {
                break;
            }
            i -= 1;
        }

        let old_node = self.pager.get_page(old_page_num)?;
        let num_keys = *old_node.internal_node_num_keys();
        let new_right_child = *old_node.internal_node_child(num_keys - 1);
        *old_node.internal_node_right_child() = new_right_child;
        *old_node.internal_node_num_keys() = num_keys - 1;

        let child_max = self.pager.max_key(child_page_num)?;
        let old_max_now = self.pager.max_key(old_page_num)?;
        let dest = if child_max < old_max_now {
            old_page_num
        } else {
            new_page_num
        };
        self.internal_node_insert(dest, child_page_num)?;
        *self.pager.get_page(child_page_num)?.parent() = dest;

        let new_old_max = self.pager.max_key(old_page_num)?;
        let parent_page_num = *self.pager.get_page(old_page_num)?.parent();
        self.pager
            .get_page(parent_page_num)?
            .update_internal_node_key(old_max, new_old_max);

        if !root_splitting {
            self.internal_node_insert(parent_page_num, new_page_num)?;
            *self.pager.get_page(new_page_num)?.parent() = parent_page_num;
        }

        Ok(())
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        if let Err(e) = self.db_close() {
            error!("failed to flush table on drop: {e}");
        }
    }
}
