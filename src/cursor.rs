use log::debug;

use crate::{
    error::EngineResult,
    node::{
        LeafNodeCell, Node, LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS,
        LEAF_NODE_RIGHT_SPLIT_COUNT,
    },
    row::Row,
    table::Table,
};

/// A position in the tree: a concrete `(page_num, cell_num)` plus a flag
/// for "one past the last row", set only by scan entry points. Cursors are
/// single-use snapshots — an insert that splits invalidates any cursor a
/// caller might still be holding, so `find` must be re-issued afterward.
pub struct Cursor<'a> {
    pub table: &'a mut Table,
    page_num: u32,
    pub cell_num: u32,
    pub end_of_table: bool,
}

impl<'a> Cursor<'a> {
    pub fn page_num(&self) -> u32 {
        self.page_num
    }

    pub fn table_start(table: &'a mut Table) -> EngineResult<Self> {
        let mut cursor = Cursor::table_find(table, 0)?;
        let node = cursor.table.pager.get_page(cursor.page_num)?;
        cursor.end_of_table = *node.leaf_node_num_cells() == 0;
        Ok(cursor)
    }

    /// Returns the position of `key`. If absent, returns the position where
    /// it should be inserted.
    pub fn table_find(table: &'a mut Table, key: u32) -> EngineResult<Self> {
        let root_page_num = table.root_page_num;
        let root_node = table.pager.get_page(root_page_num)?;

        match *root_node {
            Node::Leaf { .. } => Cursor::leaf_node_find(table, root_page_num, key),
            Node::Internal { .. } => Cursor::internal_node_find(table, root_page_num, key),
        }
    }

    fn leaf_node_find(table: &'a mut Table, page_num: u32, key: u32) -> EngineResult<Self> {
        let node = table.pager.get_page(page_num)?;
        let num_cells = *node.leaf_node_num_cells();

        let mut min_index = 0;
        let mut one_past_max_index = num_cells;
        let mut found = None;

        while one_past_max_index != min_index {
            let index = (min_index + one_past_max_index) / 2;
            let key_at_index = *node.leaf_node_key(index);

            if key == key_at_index {
                found = Some(index);
                break;
            } else if key < key_at_index {
                one_past_max_index = index;
            } else {
                min_index = index + 1;
            }
        }

        let cell_num = found.unwrap_or(min_index);

        Ok(Self {
            table,
            page_num,
            cell_num,
            end_of_table: false,
        })
    }

    fn internal_node_find(table: &'a mut Table, page_num: u32, key: u32) -> EngineResult<Self> {
        let node = table.pager.get_page(page_num)?;
        let child_index = node.internal_node_find_child(key);
        let child_num = *node.internal_node_child(child_index);

        let child = table.pager.get_page(child_num)?;
        match *child {
            Node::Leaf { .. } => Cursor::leaf_node_find(table, child_num, key),
            Node::Internal { .. } => Cursor::internal_node_find(table, child_num, key),
        }
    }

    pub fn value(&mut self) -> EngineResult<&mut Row> {
        let page_num = self.page_num;
        let page = self.table.pager.get_page(page_num)?;
        Ok(page.leaf_node_value(self.cell_num))
    }

    pub fn advance(&mut self) -> EngineResult<()> {
        let node = self.table.pager.get_page(self.page_num)?;
        self.cell_num += 1;
        let num_cells = *node.leaf_node_num_cells();

        if self.cell_num >= num_cells {
            let next_page_num = *node.leaf_node_next_leaf();
            if next_page_num == 0 {
                self.end_of_table = true;
            } else {
                self.page_num = next_page_num;
                self.cell_num = 0;
            }
        }

        Ok(())
    }

    /// Inserts `(key, row)` at this cursor's position, splitting the leaf
    /// first if it is already full. Duplicate detection is the caller's
    /// responsibility (see `Statement::execute_insert`).
    pub fn leaf_node_insert(&mut self, key: u32, row: Row) -> EngineResult<()> {
        let node = self.table.pager.get_page(self.page_num)?;
        let num_cells = *node.leaf_node_num_cells();

        if num_cells as usize >= LEAF_NODE_MAX_CELLS {
            return self.leaf_node_split_and_insert(key, row);
        }

        if self.cell_num < num_cells {
            let mut i = num_cells;
            while i > self.cell_num {
                let prev = std::mem::replace(node.leaf_node_cell(i - 1), LeafNodeCell::new());
                *node.leaf_node_cell(i) = prev;
                i -= 1;
            }
        }

        *node.leaf_node_num_cells() += 1;
        *node.leaf_node_key(self.cell_num) = key;
        *node.leaf_node_value(self.cell_num) = row;
        Ok(())
    }

    /// Allocates a new leaf, redistributes `LEAF_NODE_MAX_CELLS + 1` cells
    /// (the existing ones plus the new one) between the two, splices the
    /// leaf chain, and propagates the split upward (root growth or an
    /// internal insert into the parent).
    fn leaf_node_split_and_insert(&mut self, key: u32, row: Row) -> EngineResult<()> {
        let new_page_num = self.table.pager.allocate_page()?;
        debug!(
            "leaf {} full; splitting into {}",
            self.page_num, new_page_num
        );

        let old_max = self.table.pager.max_key(self.page_num)?;

        let old_node = self.table.pager.get_page(self.page_num)?;
        let next_leaf = *old_node.leaf_node_next_leaf();
        let old_node_parent = *old_node.parent();
        *old_node.leaf_node_next_leaf() = new_page_num;

        let new_node = self.table.pager.get_page(new_page_num)?;
        *new_node.leaf_node_next_leaf() = next_leaf;
        *new_node.parent() = old_node_parent;

        // Move cells above the insertion point right by one, starting from
        // the high end so nothing is overwritten before it's read.
        for i in (self.cell_num as usize + 1..=LEAF_NODE_MAX_CELLS).rev() {
            let old_node = self.table.pager.get_page(self.page_num)?;
            let cell = std::mem::replace(old_node.leaf_node_cell(i as u32 - 1), LeafNodeCell::new());
            let destination_page = if i >= LEAF_NODE_LEFT_SPLIT_COUNT {
                new_page_num
            } else {
                self.page_num
            };
            let index_within_node = (i % LEAF_NODE_LEFT_SPLIT_COUNT) as u32;
            *self
                .table
                .pager
                .get_page(destination_page)?
                .leaf_node_cell(index_within_node) = cell;
        }

        // Write the new cell itself.
        let destination_page = if self.cell_num as usize >= LEAF_NODE_LEFT_SPLIT_COUNT {
            new_page_num
        } else {
            self.page_num
        };
        let index_within_node = (self.cell_num as usize % LEAF_NODE_LEFT_SPLIT_COUNT) as u32;
        let destination_node = self.table.pager.get_page(destination_page)?;
        *destination_node.leaf_node_key(index_within_node) = key;
        *destination_node.leaf_node_value(index_within_node) = row;

        // Move cells below the insertion point, unchanged in relative order.
        for i in (0..self.cell_num as usize).rev() {
            let old_node = self.table.pager.get_page(self.page_num)?;
            let cell = std::mem::replace(old_node.leaf_node_cell(i as u32), LeafNodeCell::new());
            let destination_page = if i >= LEAF_NODE_LEFT_SPLIT_COUNT {
                new_page_num
            } else {
                self.page_num
            };
            let index_within_node = (i % LEAF_NODE_LEFT_SPLIT_COUNT) as u32;
            *self
                .table
                .pager
                .get_page(destination_page)?
                .leaf_node_cell(index_within_node) = cell;
        }

        let new_node = self.table.pager.get_page(new_page_num)?;
        *new_node.leaf_node_num_cells() = LEAF_NODE_RIGHT_SPLIT_COUNT as u32;

        let old_node = self.table.pager.get_page(self.page_num)?;
        *old_node.leaf_node_num_cells() = LEAF_NODE_LEFT_SPLIT_COUNT as u32;

        if old_node.is_node_root() {
            self.table.create_new_root(new_page_num)?;
        } else {
            let parent_page_num = *old_node.parent();
            let new_max = self.table.pager.max_key(self.page_num)?;
            self.table
                .pager
                .get_page(parent_page_num)?
                .update_internal_node_key(old_max, new_max);
            self.table
                .internal_node_insert(parent_page_num, new_page_num)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    fn open_table(dir: &tempfile::TempDir, name: &str) -> Table {
        let path = dir.path().join(name);
        Table::db_open(path.to_str().unwrap()).unwrap()
    }

    fn insert_key(table: &mut Table, key: u32) {
        let row = Row::new(&key.to_string(), "user", "user@example.com").unwrap();
        let mut cursor = Cursor::table_find(table, key).unwrap();
        cursor.leaf_node_insert(key, row).unwrap();
    }

    #[test]
    fn table_start_on_empty_table_is_immediately_at_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = open_table(&dir, "empty.db");
        let cursor = Cursor::table_start(&mut table).unwrap();
        assert!(cursor.end_of_table);
    }

    #[test]
    fn inserting_out_of_order_keeps_a_single_leaf_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = open_table(&dir, "unsplit.db");

        for key in [5, 1, 3, 4, 2] {
            insert_key(&mut table, key);
        }

        let mut cursor = Cursor::table_start(&mut table).unwrap();
        let mut seen = Vec::new();
        while !cursor.end_of_table {
            seen.push(cursor.value().unwrap().id());
            cursor.advance().unwrap();
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn leaf_split_distributes_cells_evenly_and_splices_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = open_table(&dir, "split.db");

        for key in 1..=14 {
            insert_key(&mut table, key);
        }

        let root = table.pager.get_page(table.root_page_num).unwrap().clone();
        let right_child_pointer = match root {
            Node::Internal {
                right_child_pointer,
                ..
            } => right_child_pointer,
            Node::Leaf { .. } => panic!("expected root to have split into an internal node"),
        };
        let left = *table
            .pager
            .get_page(table.root_page_num)
            .unwrap()
            .internal_node_child(0);

        let left_node = table.pager.get_page(left).unwrap().clone();
        let right_node = table.pager.get_page(right_child_pointer).unwrap().clone();

        match (left_node, right_node) {
            (
                Node::Leaf {
                    num_cells: left_cells,
                    next_leaf_pointer,
                    ..
                },
                Node::Leaf {
                    num_cells: right_cells,
                    next_leaf_pointer: right_next,
                    ..
                },
            ) => {
                assert_eq!(left_cells, 7);
                assert_eq!(right_cells, 7);
                assert_eq!(next_leaf_pointer, right_child_pointer);
                assert_eq!(right_next, 0);
            }
            _ => panic!("expected both children of the split root to be leaves"),
        }
    }
}
