use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

use log::{debug, trace};

use crate::error::{EngineError, EngineResult};
use crate::node::Node;

pub const PAGE_SIZE: usize = 4096;
pub const TABLE_MAX_PAGES: usize = 100;

/// Owns the file handle and the in-memory page cache. Pages materialize on
/// first access and stay resident until `close` flushes them back; there is
/// no eviction and no free list, so allocation is strictly append-only.
pub struct Pager {
    file: File,
    file_length: u64,
    pub num_pages: u32,
    cache: Vec<Option<Box<Node>>>,
}

impl Pager {
    pub fn open(filename: &str) -> EngineResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(filename)?;

        let file_length = file.metadata()?.len();
        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(EngineError::CorruptFile);
        }

        let num_pages = (file_length / PAGE_SIZE as u64) as u32;
        let cache = (0..=TABLE_MAX_PAGES).map(|_| None).collect();

        Ok(Self {
            file,
            file_length,
            num_pages,
            cache,
        })
    }

    fn validate_page_num(page_num: u32) -> EngineResult<()> {
        if page_num as usize > TABLE_MAX_PAGES {
            return Err(EngineError::OutOfBoundsPage(page_num));
        }
        Ok(())
    }

    pub fn get_page(&mut self, page_num: u32) -> EngineResult<&mut Node> {
        Self::validate_page_num(page_num)?;

        if self.cache[page_num as usize].is_none() {
            let mut page = Node::initialize_leaf_node();

            let mut pages_on_disk = self.file_length / PAGE_SIZE as u64;
            if self.file_length % PAGE_SIZE as u64 != 0 {
                pages_on_disk += 1;
            }

            if page_num as u64 <= pages_on_disk {
                trace!("paging in page {page_num} from disk");
                let offset = page_num as u64 * PAGE_SIZE as u64;
                self.file.seek(SeekFrom::Start(offset))?;

                let mut buffer = [0u8; PAGE_SIZE];
                // A short read at the tail of the file is fine: the rest of
                // the buffer stays zeroed.
                let _ = self.file.read(&mut buffer)?;

                page = Node::from_bytes(&buffer);
            }

            self.cache[page_num as usize] = Some(Box::new(page));

            if page_num >= self.num_pages {
                self.num_pages = page_num + 1;
            }
        }

        Ok(self.cache[page_num as usize].as_mut().unwrap())
    }

    pub fn flush(&mut self, page_num: u32) -> EngineResult<()> {
        Self::validate_page_num(page_num)?;

        let page = self.cache[page_num as usize]
            .as_ref()
            .ok_or(EngineError::OutOfBoundsPage(page_num))?;

        let offset = page_num as u64 * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&page.to_bytes())?;
        Ok(())
    }

    /// No free list: new pages always go on the end of the file. This is a
    /// known growth leak if deletion is ever added.
    pub fn allocate_page(&mut self) -> EngineResult<u32> {
        if self.num_pages as usize >= TABLE_MAX_PAGES {
            return Err(EngineError::TableFull);
        }
        Ok(self.num_pages)
    }

    /// `max_key` for a leaf is its last key; for an internal node it is the
    /// max key of its right child, recursively — the tree's definition of
    /// "the largest key reachable from this page".
    pub fn max_key(&mut self, page_num: u32) -> EngineResult<u32> {
        let node = self.get_page(page_num)?;
        match *node {
            Node::Leaf { num_cells, .. } => {
                let key = *self.get_page(page_num)?.leaf_node_key(num_cells - 1);
                Ok(key)
            }
            Node::Internal {
                right_child_pointer,
                ..
            } => self.max_key(right_child_pointer),
        }
    }

    pub fn close(&mut self) -> EngineResult<()> {
        for page_num in 0..self.cache.len() as u32 {
            if self.cache[page_num as usize].is_some() {
                debug!("flushing page {page_num} on close");
                self.flush(page_num)?;
            }
        }
        Ok(())
    }
}
