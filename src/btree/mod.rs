//! # B+Tree Index
//!
//! A disk-backed B+tree mapping 32-bit signed integer keys to record ids
//! in a heap table. The tree is clustered on the key, supports point
//! lookup, insertion, and forward range scans; deletion is not supported.
//!
//! ## Architecture Overview
//!
//! - All `(key, record id)` entries live in leaf nodes, one node per page
//! - Interior nodes hold separator keys and child page pointers
//! - All leaves sit at the same depth and are chained left-to-right for
//!   range scans
//! - Page 0 of the index file holds the header (root page id, tree height)
//!
//! ```text
//!                  [Interior, page 5]
//!                  /       |        \
//!        [Leaf 1]     [Leaf 3]     [Leaf 4]
//!           |------------>|----------->|---> -1   (sibling chain)
//! ```
//!
//! ## Node Splitting
//!
//! Insertion into a full leaf splits it: the merged 85-entry sequence is
//! cut so the left node keeps the first 43 entries, the right sibling's
//! first key becomes the separator in the parent, and the sibling chain
//! is rewired. Interior overflow promotes the middle separator to the
//! parent; the promoted key appears in neither child. A root split
//! allocates a fresh root and grows the tree by one level.
//!
//! Rather than parent pointers in nodes, the facade records the page ids
//! visited during descent and walks that breadcrumb path backwards when a
//! split propagates. Pages stay self-describing and the only cost is a
//! small per-descent list.
//!
//! ## Node Types
//!
//! Leaf and interior nodes have disjoint operations, so they are two
//! concrete types with no shared trait: the caller always knows which
//! level it is reading.
//!
//! ## Concurrency
//!
//! Single-threaded, single-writer. A `BTreeIndex` exclusively owns its
//! page file for the duration of a session; there is no locking and no
//! suspension point.

mod index;
mod interior;
mod leaf;

pub use index::{BTreeIndex, IndexCursor};
pub use interior::{
    InteriorEntry, InteriorNode, InteriorNodeMut, INTERIOR_ENTRY_SIZE, INTERIOR_ENTRY_START,
};
pub use leaf::{LeafEntry, LeafNode, LeafNodeMut, SearchResult, LEAF_ENTRY_SIZE, LEAF_ENTRY_START};

use crate::storage::PAGE_SIZE;

/// Maximum entries per node, shared by both node types.
pub const MAX_KEYS: usize = 84;

/// Page id sentinel for "no page" in the next-leaf pointer and the header.
pub const NO_PAGE: i32 = -1;

// Both layouts must fit a page: count + entries + next pointer for leaves,
// count + leading child + entries for interior nodes.
const _: () = assert!(4 + LEAF_ENTRY_SIZE * MAX_KEYS + 4 <= PAGE_SIZE);
const _: () = assert!(4 + 4 + INTERIOR_ENTRY_SIZE * MAX_KEYS <= PAGE_SIZE);
