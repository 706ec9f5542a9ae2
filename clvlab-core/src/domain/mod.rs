//! Domain types: feed sources and column-oriented datasets.

pub mod dataset;
pub mod source;

pub use dataset::Dataset;
pub use source::Source;
