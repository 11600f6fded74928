//! Application layer over fragments.

pub mod build;
pub mod collect;
pub mod create;
pub mod template;
pub mod wrap;
