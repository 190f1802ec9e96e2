use crate::{
    pager::PAGE_SIZE,
    row::{Row, ROW_SIZE},
};

/// Sentinel meaning "no right child assigned yet" for a freshly initialized
/// internal node. Distinct from page 0 (the root), which a right child
/// pointer could otherwise be confused with.
pub const INVALID_PAGE_NUM: u32 = 0xFFFFFFFF;

const NODE_TYPE_INTERNAL: u8 = 0;
const NODE_TYPE_LEAF: u8 = 1;

// Common Node Header Layout
pub const NODE_TYPE_SIZE: usize = std::mem::size_of::<u8>();
pub const NODE_TYPE_OFFSET: usize = 0;
pub const IS_ROOT_SIZE: usize = std::mem::size_of::<u8>();
pub const IS_ROOT_OFFSET: usize = NODE_TYPE_SIZE;
pub const PARENT_POINTER_SIZE: usize = std::mem::size_of::<u32>();
pub const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

// Leaf Node Header Layout
pub const LEAF_NODE_NUM_CELLS_SIZE: usize = std::mem::size_of::<u32>();
pub const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const LEAF_NODE_NEXT_LEAF_SIZE: usize = std::mem::size_of::<u32>();
pub const LEAF_NODE_NEXT_LEAF_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + LEAF_NODE_NUM_CELLS_SIZE;
pub const LEAF_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE + LEAF_NODE_NEXT_LEAF_SIZE;

// Leaf Node Body Layout
pub const LEAF_NODE_KEY_SIZE: usize = std::mem::size_of::<u32>();
pub const LEAF_NODE_KEY_OFFSET: usize = 0;
pub const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
pub const LEAF_NODE_VALUE_OFFSET: usize = LEAF_NODE_KEY_OFFSET + LEAF_NODE_KEY_SIZE;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;

pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) / 2;
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize =
    (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_RIGHT_SPLIT_COUNT;

// Internal Node Header Layout
pub const INTERNAL_NODE_NUM_KEYS_SIZE: usize = std::mem::size_of::<u32>();
pub const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = std::mem::size_of::<u32>();
pub const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;

pub const INTERNAL_NODE_KEY_SIZE: usize = std::mem::size_of::<u32>();
pub const INTERNAL_NODE_CHILD_SIZE: usize = std::mem::size_of::<u32>();
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;
// Kept small (per the reference) so splits and root growth are exercisable
// without needing tens of thousands of rows.
pub const INTERNAL_NODE_MAX_CELLS: usize = 3;

// Leaf Node Format
// |-------------+----------------+----------------+-----------+--------------------|
// | byte 0      | byte 1         | bytes 2-5      | bytes 6-9 | bytes 10-13        |
// | node_type   | is_root        | parent_pointer | num_cells | next_leaf_pointer  |
// |-------------+----------------+----------------+-----------+--------------------|
// | bytes 14-17                  | bytes 18-...                                    |
// | key 0                        | value 0                                         |
// |------------------------------+-------------------------------------------------|
// |             ...              |          ...                                    |
// |--------------------------------------------------------------------------------|
//
// Internal Node Format
// |-----------+---------+----------------+-----------+---------------------|
// | byte 0    | byte 1  | bytes 2-5      | bytes 6-9 | bytes 10-13         |
// | node_type | is_root | parent_pointer | num_keys  | right_child_pointer |
// |-----------+---------+----------------+-----------+---------------------|
// | bytes 14-17                         | bytes 18-21                      |
// | child pointer 0                     | key 0                            |
// |-------------------------------------+----------------------------------|
// |                 ...                 |             ...                  |
// |------------------------------------------------------------------------|

#[derive(Debug, Clone)]
pub enum Node {
    Leaf {
        is_root: bool,
        parent_pointer: u32,
        num_cells: u32,
        next_leaf_pointer: u32,
        cells: Vec<LeafNodeCell>,
    },
    Internal {
        is_root: bool,
        parent_pointer: u32,
        num_keys: u32,
        right_child_pointer: u32,
        cells: Vec<InternalNodeCell>,
    },
}

#[derive(Debug, Clone)]
pub struct LeafNodeCell {
    key: u32,
    value: Row,
}

impl LeafNodeCell {
    pub fn new() -> Self {
        Self {
            key: 0,
            value: Row::deserialize(&[0; ROW_SIZE]),
        }
    }
}

impl Default for LeafNodeCell {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InternalNodeCell {
    child_pointer: u32,
    key: u32,
}

impl InternalNodeCell {
    pub fn new() -> Self {
        Self {
            child_pointer: 0,
            key: 0,
        }
    }

    pub fn set(&mut self, child_pointer: u32, key: u32) {
        self.child_pointer = child_pointer;
        self.key = key;
    }
}

impl Default for InternalNodeCell {
    fn default() -> Self {
        Self::new()
    }
}

impl Node {
    pub fn initialize_leaf_node() -> Self {
        let cells = (0..LEAF_NODE_MAX_CELLS).map(|_| LeafNodeCell::new()).collect();
        Node::Leaf {
            is_root: false,
            parent_pointer: 0,
            num_cells: 0,
            next_leaf_pointer: 0,
            cells,
        }
    }

    pub fn initialize_internal_node() -> Self {
        let cells = (0..INTERNAL_NODE_MAX_CELLS)
            .map(|_| InternalNodeCell::new())
            .collect();
        Node::Internal {
            is_root: false,
            parent_pointer: 0,
            num_keys: 0,
            right_child_pointer: INVALID_PAGE_NUM,
            cells,
        }
    }

    pub fn leaf_node_num_cells(&mut self) -> &mut u32 {
        match *self {
            Node::Leaf {
                ref mut num_cells, ..
            } => num_cells,
            Node::Internal { .. } => panic!("leaf_node_num_cells: not a leaf node"),
        }
    }

    pub fn leaf_node_cell(&mut self, cell_num: u32) -> &mut LeafNodeCell {
        match *self {
            Node::Leaf { ref mut cells, .. } => &mut cells[cell_num as usize],
            Node::Internal { .. } => panic!("leaf_node_cell: not a leaf node"),
        }
    }

    pub fn leaf_node_key(&mut self, cell_num: u32) -> &mut u32 {
        &mut self.leaf_node_cell(cell_num).key
    }

    pub fn leaf_node_value(&mut self, cell_num: u32) -> &mut Row {
        &mut self.leaf_node_cell(cell_num).value
    }

    pub fn leaf_node_next_leaf(&mut self) -> &mut u32 {
        match *self {
            Node::Leaf {
                ref mut next_leaf_pointer,
                ..
            } => next_leaf_pointer,
            Node::Internal { .. } => panic!("leaf_node_next_leaf: not a leaf node"),
        }
    }

    pub fn is_node_root(&self) -> bool {
        match *self {
            Node::Leaf { is_root, .. } => is_root,
            Node::Internal { is_root, .. } => is_root,
        }
    }

    pub fn set_node_root(&mut self, is_root: bool) {
        let slot = match *self {
            Node::Leaf {
                ref mut is_root, ..
            } => is_root,
            Node::Internal {
                ref mut is_root, ..
            } => is_root,
        };
        *slot = is_root;
    }

    pub fn parent(&mut self) -> &mut u32 {
        match *self {
            Node::Leaf {
                ref mut parent_pointer,
                ..
            } => parent_pointer,
            Node::Internal {
                ref mut parent_pointer,
                ..
            } => parent_pointer,
        }
    }

    pub fn internal_node_num_keys(&mut self) -> &mut u32 {
        match *self {
            Node::Leaf { .. } => panic!("internal_node_num_keys: not an internal node"),
            Node::Internal {
                ref mut num_keys, ..
            } => num_keys,
        }
    }

    pub fn internal_node_right_child(&mut self) -> &mut u32 {
        match *self {
            Node::Leaf { .. } => panic!("internal_node_right_child: not an internal node"),
            Node::Internal {
                ref mut right_child_pointer,
                ..
            } => right_child_pointer,
        }
    }

    pub fn internal_node_cell(&mut self, key_num: u32) -> &mut InternalNodeCell {
        match *self {
            Node::Leaf { .. } => panic!("internal_node_cell: not an internal node"),
            Node::Internal { ref mut cells, .. } => &mut cells[key_num as usize],
        }
    }

    /// `child_num == num_keys` means "the rightmost child" and is served
    /// from `right_child_pointer` rather than the cell array.
    pub fn internal_node_child(&mut self, child_num: u32) -> &mut u32 {
        let num_keys = *self.internal_node_num_keys();

        if child_num > num_keys {
            panic!("tried to access child_num {child_num} > num_keys {num_keys}");
        } else if child_num == num_keys {
            self.internal_node_right_child()
        } else {
            &mut self.internal_node_cell(child_num).child_pointer
        }
    }

    pub fn internal_node_key(&mut self, key_num: u32) -> &mut u32 {
        &mut self.internal_node_cell(key_num).key
    }

    /// Smallest index `i` with `key <= key(i)`; `num_keys` if none (the
    /// key belongs under the right child).
    pub fn internal_node_find_child(&mut self, key: u32) -> u32 {
        let num_keys = *self.internal_node_num_keys();

        let mut min_index = 0;
        let mut max_index = num_keys;

        while min_index != max_index {
            let index = (min_index + max_index) / 2;
            let key_to_right = *self.internal_node_key(index);

            if key_to_right >= key {
                max_index = index;
            } else {
                min_index = index + 1;
            }
        }

        min_index
    }

    pub fn update_internal_node_key(&mut self, old_key: u32, new_key: u32) {
        let old_child_index = self.internal_node_find_child(old_key);
        *self.internal_node_key(old_child_index) = new_key;
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let node_type = bytes[NODE_TYPE_OFFSET];
        let is_root = bytes[IS_ROOT_OFFSET] == 1;

        let parent_pointer = read_u32(bytes, PARENT_POINTER_OFFSET);

        if node_type == NODE_TYPE_LEAF {
            let num_cells = read_u32(bytes, LEAF_NODE_NUM_CELLS_OFFSET);
            let next_leaf_pointer = read_u32(bytes, LEAF_NODE_NEXT_LEAF_OFFSET);

            let mut cells = Vec::with_capacity(LEAF_NODE_MAX_CELLS);
            for i in 0..LEAF_NODE_MAX_CELLS {
                let start = LEAF_NODE_HEADER_SIZE + i * LEAF_NODE_CELL_SIZE;
                let key = read_u32(bytes, start + LEAF_NODE_KEY_OFFSET);
                let value_start = start + LEAF_NODE_VALUE_OFFSET;
                let value = Row::deserialize(&bytes[value_start..value_start + ROW_SIZE]);
                cells.push(LeafNodeCell { key, value });
            }

            Node::Leaf {
                is_root,
                parent_pointer,
                num_cells,
                next_leaf_pointer,
                cells,
            }
        } else {
            let num_keys = read_u32(bytes, INTERNAL_NODE_NUM_KEYS_OFFSET);
            let right_child_pointer = read_u32(bytes, INTERNAL_NODE_RIGHT_CHILD_OFFSET);

            let mut cells = Vec::with_capacity(INTERNAL_NODE_MAX_CELLS);
            for i in 0..INTERNAL_NODE_MAX_CELLS {
                let start = INTERNAL_NODE_HEADER_SIZE + i * INTERNAL_NODE_CELL_SIZE;
                let child_pointer = read_u32(bytes, start);
                let key = read_u32(bytes, start + INTERNAL_NODE_CHILD_SIZE);
                cells.push(InternalNodeCell { child_pointer, key });
            }

            Node::Internal {
                is_root,
                parent_pointer,
                num_keys,
                right_child_pointer,
                cells,
            }
        }
    }

    pub fn to_bytes(&self) -> [u8; PAGE_SIZE] {
        let mut page = [0u8; PAGE_SIZE];

        match self {
            Node::Leaf {
                is_root,
                parent_pointer,
                num_cells,
                next_leaf_pointer,
                cells,
            } => {
                page[NODE_TYPE_OFFSET] = NODE_TYPE_LEAF;
                page[IS_ROOT_OFFSET] = *is_root as u8;
                write_u32(&mut page, PARENT_POINTER_OFFSET, *parent_pointer);
                write_u32(&mut page, LEAF_NODE_NUM_CELLS_OFFSET, *num_cells);
                write_u32(&mut page, LEAF_NODE_NEXT_LEAF_OFFSET, *next_leaf_pointer);

                for (i, cell) in cells.iter().enumerate() {
                    let start = LEAF_NODE_HEADER_SIZE + i * LEAF_NODE_CELL_SIZE;
                    write_u32(&mut page, start + LEAF_NODE_KEY_OFFSET, cell.key);
                    let value_start = start + LEAF_NODE_VALUE_OFFSET;
                    let mut value = [0u8; ROW_SIZE];
                    cell.value.serialize(&mut value);
                    page[value_start..value_start + ROW_SIZE].copy_from_slice(&value);
                }
            }
            Node::Internal {
                is_root,
                parent_pointer,
                num_keys,
                right_child_pointer,
                cells,
            } => {
                page[NODE_TYPE_OFFSET] = NODE_TYPE_INTERNAL;
                page[IS_ROOT_OFFSET] = *is_root as u8;
                write_u32(&mut page, PARENT_POINTER_OFFSET, *parent_pointer);
                write_u32(&mut page, INTERNAL_NODE_NUM_KEYS_OFFSET, *num_keys);
                write_u32(
                    &mut page,
                    INTERNAL_NODE_RIGHT_CHILD_OFFSET,
                    *right_child_pointer,
                );

                for (i, cell) in cells.iter().enumerate() {
                    let start = INTERNAL_NODE_HEADER_SIZE + i * INTERNAL_NODE_CELL_SIZE;
                    write_u32(&mut page, start, cell.child_pointer);
                    write_u32(&mut page, start + INTERNAL_NODE_CHILD_SIZE, cell.key);
                }
            }
        }

        page
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn write_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
