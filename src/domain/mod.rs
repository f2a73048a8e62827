// Domain model for vulngraph: the call tree document, its classification
// and the flattened graph built from it.

pub mod callgraph;
pub mod classifier;
pub mod details;
pub mod graph;
