//! Domain-specific errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("can not find `{0}` type")]
    TypeNotFound(String),
    #[error("can not find type with `{0}` suffix")]
    SuffixNotFound(String),
}
