//! Spatial indexing for node merging.
//!
//! This module provides an R-tree based spatial index used to find the graph
//! node a newly placed connector coincides with.

mod rtree;

pub use rtree::SpatialIndex;
