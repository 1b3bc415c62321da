//! Status normalization and coloring

pub mod colors;
pub mod normalizer;
