//! Core data structures for vector search.
//!
//! This module contains the distance metrics and the dense row-major
//! embedding matrix shared by both index structures.

pub mod distance;
pub mod embedding;
