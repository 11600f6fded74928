//! Domain types for fragments, fragment types, and display ordering.

pub mod errors;
pub mod fragments;
pub mod merge;
