//! Broad-phase lookup of placed footprints using an R*-tree.
//!
//! The arrangement engine keeps one entry per object whose footprint is on
//! the plate, so a candidate position only runs the triangle tests against
//! neighbours whose bounding boxes come within the margin.

use bedplate_core::transform::AABB2D;
use rstar::{RTree, RTreeObject, AABB};

/// An entry in the index: an object slot and its plate-plane bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialEntry {
    /// Index of the object in the caller's list.
    pub index: usize,
    /// Bounding box of the object's footprint at its current position.
    pub aabb: AABB2D,
}

impl SpatialEntry {
    pub fn new(index: usize, aabb: AABB2D) -> Self {
        Self { index, aabb }
    }
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.aabb.min_x, self.aabb.min_y],
            [self.aabb.max_x, self.aabb.max_y],
        )
    }
}

/// R*-tree over footprint bounding boxes.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
}

impl SpatialIndex {
    /// Creates a new empty spatial index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Creates a spatial index with the given entries.
    pub fn with_entries(entries: Vec<SpatialEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn insert(&mut self, entry: SpatialEntry) {
        self.tree.insert(entry);
    }

    /// Removes an entry; returns false if it was not present.
    pub fn remove(&mut self, entry: &SpatialEntry) -> bool {
        self.tree.remove(entry).is_some()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    /// Finds all entries whose bounding boxes intersect `aabb` (touching counts).
    pub fn query_aabb(&self, aabb: &AABB2D) -> Vec<&SpatialEntry> {
        let envelope = AABB::from_corners([aabb.min_x, aabb.min_y], [aabb.max_x, aabb.max_y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    /// Finds all entries within `margin` of `aabb`.
    pub fn query_with_margin(&self, aabb: &AABB2D, margin: f64) -> Vec<&SpatialEntry> {
        self.query_aabb(&aabb.expanded(margin))
    }

    /// Indices of objects that may conflict with `aabb` at the given margin.
    pub fn neighbours(&self, aabb: &AABB2D, margin: f64) -> Vec<usize> {
        self.query_with_margin(aabb, margin)
            .iter()
            .map(|entry| entry.index)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpatialEntry> {
        self.tree.iter()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
