//! # Index Facade
//!
//! `BTreeIndex` owns the page file for the duration of a session and ties
//! the node codecs together: it maintains the header (root page id and
//! tree height, cached in memory and persisted on page 0), performs
//! root-to-leaf descent while recording a breadcrumb path, and propagates
//! splits upward along that path.
//!
//! ## Header
//!
//! Page 0 stores the root page id (-1 when empty) and the tree height
//! (0 when empty; 1 means the root is a leaf). The in-memory copy is
//! authoritative during a session; it is written back after every
//! structural change and again on `close`, so a crash between mutations
//! loses at most unsynced pages, never a stale-header tree.
//!
//! ## Descent and Breadcrumbs
//!
//! Every `locate` records the page ids it visits, root first, leaf last.
//! Insertion reuses the freshest path to find parents during split
//! propagation, so nodes carry no parent pointers. A split posts the
//! separator at level `height - 2` and walks toward the root; when the
//! root itself splits, a new root is allocated and the tree grows by one
//! level.
//!
//! ## Write Ordering
//!
//! An insertion that triggers N splits touches 2 + 2N pages in order:
//! leaf and its sibling first, then each interior level, finally the new
//! root. All I/O is synchronous whole-page access; durability is the
//! caller's concern via `close`/`sync`.
//!
//! ## Cursors
//!
//! `locate` yields an [`IndexCursor`] positioned at the first entry >=
//! the search key whether or not the key was found. `read_forward`
//! returns the entry under the cursor and advances, hopping through the
//! sibling chain; at the end of the last leaf it yields `None` and keeps
//! doing so on further calls.

use std::path::Path;

use eyre::{bail, ensure, Result};
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::records::RecordId;
use crate::storage::{AccessMode, IndexFileHeader, PageFile, PAGE_SIZE};

use super::interior::{InteriorNode, InteriorNodeMut};
use super::leaf::{LeafNode, LeafNodeMut, SearchResult};
use super::NO_PAGE;

const HEADER_PID: u32 = 0;

/// Position in the leaf chain: a leaf page id and an entry index.
/// `pid` is `None` once the cursor has run off the end of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexCursor {
    pid: Option<u32>,
    eid: usize,
}

impl IndexCursor {
    pub fn position(&self) -> Option<(u32, usize)> {
        self.pid.map(|pid| (pid, self.eid))
    }
}

#[derive(Debug)]
pub struct BTreeIndex {
    file: PageFile,
    root: Option<u32>,
    height: u32,
    // page ids visited on the most recent descent, root first, leaf last
    path: SmallVec<[u32; 8]>,
}

impl BTreeIndex {
    pub fn open<P: AsRef<Path>>(path: P, mode: AccessMode) -> Result<Self> {
        let mut file = PageFile::open(&path, mode)?;

        if file.end_pid() == 0 {
            if mode == AccessMode::Write {
                let pid = file.allocate_page()?;
                IndexFileHeader::new(NO_PAGE, 0).write_to(file.page_mut(pid)?)?;
                info!(path = %path.as_ref().display(), "created index file");
            }
            return Ok(Self {
                file,
                root: None,
                height: 0,
                path: SmallVec::new(),
            });
        }

        let header = IndexFileHeader::from_bytes(file.page(HEADER_PID)?)?;
        let root_pid = header.root_pid();
        let height = header.tree_height();

        let root = match root_pid {
            NO_PAGE => {
                ensure!(
                    height == 0,
                    "invalid index file format: no root but height {}",
                    height
                );
                None
            }
            pid if pid > 0 && (pid as u32) < file.end_pid() => {
                ensure!(
                    height >= 1,
                    "invalid index file format: root {} with height {}",
                    pid,
                    height
                );
                Some(pid as u32)
            }
            pid => bail!("invalid index file format: root page {} out of range", pid),
        };

        Ok(Self {
            file,
            root,
            height: height as u32,
            path: SmallVec::new(),
        })
    }

    /// Persists the header and syncs all pending writes.
    pub fn close(mut self) -> Result<()> {
        if self.file.mode() == AccessMode::Write {
            self.write_header()?;
            self.file.sync()?;
        }
        Ok(())
    }

    pub fn tree_height(&self) -> u32 {
        self.height
    }

    pub fn root_pid(&self) -> Option<u32> {
        self.root
    }

    fn write_header(&mut self) -> Result<()> {
        let root = self.root.map(|pid| pid as i32).unwrap_or(NO_PAGE);
        let page = self.file.page_mut(HEADER_PID)?;
        let header = IndexFileHeader::from_bytes_mut(page)?;
        header.set_root_pid(root);
        header.set_tree_height(self.height as i32);
        Ok(())
    }

    // Root-to-leaf walk for a key, recording the breadcrumb path.
    fn descend(&mut self, key: i32) -> Result<u32> {
        let Some(root) = self.root else {
            bail!("descend into an empty tree");
        };

        self.path.clear();
        self.path.push(root);

        let mut pid = root;
        for _ in 1..self.height {
            let page = self.file.page(pid)?;
            let node = InteriorNode::from_page(page)?;
            pid = node.locate_child(key)?;
            self.path.push(pid);
        }
        Ok(pid)
    }

    /// Positions a cursor at the first entry >= `key`. The boolean
    /// reports whether an entry with exactly `key` exists; the cursor is
    /// valid either way.
    pub fn locate(&mut self, key: i32) -> Result<(IndexCursor, bool)> {
        if self.root.is_none() {
            return Ok((IndexCursor { pid: None, eid: 0 }, false));
        }

        let leaf_pid = self.descend(key)?;
        let leaf = LeafNode::from_page(self.file.page(leaf_pid)?)?;
        let (eid, found) = match leaf.find_key(key) {
            SearchResult::Found(eid) => (eid, true),
            SearchResult::NotFound(eid) => (eid, false),
        };

        Ok((
            IndexCursor {
                pid: Some(leaf_pid),
                eid,
            },
            found,
        ))
    }

    /// Reads the entry under the cursor and advances it, following the
    /// sibling chain. Returns `None` past the last entry of the last
    /// leaf, and keeps returning `None` thereafter.
    pub fn read_forward(&self, cursor: &mut IndexCursor) -> Result<Option<(i32, RecordId)>> {
        loop {
            let Some(pid) = cursor.pid else {
                return Ok(None);
            };

            let leaf = LeafNode::from_page(self.file.page(pid)?)?;
            let count = leaf.entry_count();

            // A cursor can sit one past the last entry when locate ran off
            // the end of a leaf; the next entry lives in the right sibling.
            if cursor.eid >= count {
                cursor.pid = leaf.next_leaf();
                cursor.eid = 0;
                continue;
            }

            let entry = *leaf.entry_at(cursor.eid)?;
            if cursor.eid + 1 < count {
                cursor.eid += 1;
            } else {
                cursor.pid = leaf.next_leaf();
                cursor.eid = 0;
            }
            return Ok(Some((entry.key(), entry.rid())));
        }
    }

    pub fn insert(&mut self, key: i32, rid: RecordId) -> Result<()> {
        if self.root.is_none() {
            let pid = self.file.allocate_page()?;
            let mut leaf = LeafNodeMut::init(self.file.page_mut(pid)?)?;
            leaf.insert(key, rid)?;
            self.root = Some(pid);
            self.height = 1;
            self.write_header()?;
            debug!(root = pid, "created root leaf");
            return Ok(());
        }

        let leaf_pid = self.descend(key)?;
        {
            let mut leaf = LeafNodeMut::from_page(self.file.page_mut(leaf_pid)?)?;
            if !leaf.is_full() {
                return leaf.insert(key, rid);
            }
        }

        let (sibling_key, sibling_pid) = self.split_leaf(leaf_pid, key, rid)?;
        self.propagate_split(leaf_pid, sibling_key, sibling_pid)
    }

    fn split_leaf(&mut self, pid: u32, key: i32, rid: RecordId) -> Result<(i32, u32)> {
        let mut sibling_buf = [0u8; PAGE_SIZE];
        let sibling_key;
        {
            let mut leaf = LeafNodeMut::from_page(self.file.page_mut(pid)?)?;
            let old_next = leaf.next_leaf();
            let mut sibling = LeafNodeMut::init(&mut sibling_buf)?;
            sibling_key = leaf.insert_and_split(key, rid, &mut sibling)?;
            sibling.set_next_leaf(old_next);
        }

        let sibling_pid = self.file.allocate_page()?;
        self.file
            .page_mut(sibling_pid)?
            .copy_from_slice(&sibling_buf);

        let mut leaf = LeafNodeMut::from_page(self.file.page_mut(pid)?)?;
        leaf.set_next_leaf(Some(sibling_pid));

        debug!(
            left = pid,
            right = sibling_pid,
            separator = sibling_key,
            "split leaf"
        );
        Ok((sibling_key, sibling_pid))
    }

    fn split_interior(&mut self, pid: u32, key: i32, child: u32) -> Result<(i32, u32)> {
        let mut sibling_buf = [0u8; PAGE_SIZE];
        let mid_key;
        {
            let mut node = InteriorNodeMut::from_page(self.file.page_mut(pid)?)?;
            let mut sibling = InteriorNodeMut::init(&mut sibling_buf)?;
            mid_key = node.insert_and_split(key, child, &mut sibling)?;
        }

        let sibling_pid = self.file.allocate_page()?;
        self.file
            .page_mut(sibling_pid)?
            .copy_from_slice(&sibling_buf);

        debug!(
            left = pid,
            right = sibling_pid,
            promoted = mid_key,
            "split interior"
        );
        Ok((mid_key, sibling_pid))
    }

    // Posts a separator into the parents along the breadcrumb path,
    // splitting upward until a parent has room or the root splits.
    fn propagate_split(&mut self, left_pid: u32, key: i32, right_pid: u32) -> Result<()> {
        let mut left_pid = left_pid;
        let mut key = key;
        let mut right_pid = right_pid;

        let mut level = self.height as i64 - 2;
        while level >= 0 {
            let parent_pid = self.path[level as usize];
            {
                let mut parent = InteriorNodeMut::from_page(self.file.page_mut(parent_pid)?)?;
                if !parent.is_full() {
                    return parent.insert(key, right_pid);
                }
            }

            let (mid_key, sibling_pid) = self.split_interior(parent_pid, key, right_pid)?;
            left_pid = parent_pid;
            key = mid_key;
            right_pid = sibling_pid;
            level -= 1;
        }

        let new_root = self.file.allocate_page()?;
        InteriorNodeMut::initialize_root(self.file.page_mut(new_root)?, left_pid, key, right_pid)?;
        self.root = Some(new_root);
        self.height += 1;
        self.write_header()?;
        debug!(root = new_root, height = self.height, "grew tree");
        Ok(())
    }

    /// Walks the whole tree checking structural invariants: per-node key
    /// order, separator bounds, uniform leaf depth via the recorded
    /// height, and the ascending sibling chain.
    pub fn validate(&self) -> Result<()> {
        let Some(root) = self.root else {
            ensure!(self.height == 0, "empty tree with height {}", self.height);
            return Ok(());
        };
        ensure!(self.height >= 1, "non-empty tree with height 0");

        self.validate_node(root, 1, None, None)?;

        // leftmost leaf, then the chain must visit every key in order
        let mut pid = root;
        for _ in 1..self.height {
            let node = InteriorNode::from_page(self.file.page(pid)?)?;
            pid = node.leading_child();
        }

        let mut prev: Option<i32> = None;
        loop {
            let leaf = LeafNode::from_page(self.file.page(pid)?)?;
            for eid in 0..leaf.entry_count() {
                let key = leaf.entry_at(eid)?.key();
                if let Some(prev) = prev {
                    ensure!(
                        key >= prev,
                        "leaf chain out of order at page {}: {} after {}",
                        pid,
                        key,
                        prev
                    );
                }
                prev = Some(key);
            }
            match leaf.next_leaf() {
                Some(next) => pid = next,
                None => break,
            }
        }
        Ok(())
    }

    fn validate_node(
        &self,
        pid: u32,
        level: u32,
        lower: Option<i32>,
        upper: Option<i32>,
    ) -> Result<()> {
        ensure!(pid != HEADER_PID, "node stored on the header page");
        let page = self.file.page(pid)?;

        let in_bounds = |key: i32| -> Result<()> {
            if let Some(lower) = lower {
                ensure!(key >= lower, "key {} below bound {} at page {}", key, lower, pid);
            }
            if let Some(upper) = upper {
                // duplicates are tolerated at the equality boundary
                ensure!(key <= upper, "key {} above bound {} at page {}", key, upper, pid);
            }
            Ok(())
        };

        if level == self.height {
            let leaf = LeafNode::from_page(page)?;
            let mut prev: Option<i32> = None;
            for eid in 0..leaf.entry_count() {
                let key = leaf.entry_at(eid)?.key();
                if let Some(prev) = prev {
                    ensure!(key >= prev, "leaf {} keys out of order", pid);
                }
                in_bounds(key)?;
                prev = Some(key);
            }
            return Ok(());
        }

        let node = InteriorNode::from_page(page)?;
        ensure!(node.entry_count() >= 1, "interior {} has no separators", pid);

        let mut keys = Vec::with_capacity(node.entry_count());
        let mut children = Vec::with_capacity(node.entry_count() + 1);
        children.push(node.leading_child());
        for eid in 0..node.entry_count() {
            let entry = node.entry_at(eid)?;
            keys.push(entry.key());
            children.push(entry.child());
        }

        let mut prev: Option<i32> = None;
        for &key in &keys {
            if let Some(prev) = prev {
                ensure!(key >= prev, "interior {} separators out of order", pid);
            }
            in_bounds(key)?;
            prev = Some(key);
        }

        for (i, &child) in children.iter().enumerate() {
            let child_lower = if i == 0 { lower } else { Some(keys[i - 1]) };
            let child_upper = if i == keys.len() { upper } else { Some(keys[i]) };
            self.validate_node(child, level + 1, child_lower, child_upper)?;
        }
        Ok(())
    }
}
