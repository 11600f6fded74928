//! Fragments and their types, with the display order of type groups.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::merge::merge_ordered;

const SUFFIX_SEPARATOR: char = '.';

/// Built-in fragment types, in their default display order.
const DEFAULT_TYPES: [(&str, &str); 7] = [
    ("security", "Security"),
    ("feature", "Features"),
    ("change", "Changes"),
    ("fix", "Fixes"),
    ("deprecation", "Deprecations"),
    ("removal", "Removals"),
    ("internal", "Internal"),
];

/// A named category of change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FragmentType {
    /// Short identifier, also used as the file suffix.
    pub name: String,
    /// Heading rendered above the group.
    pub title: String,
}

impl FragmentType {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
        }
    }

    /// The file suffix matching this type, e.g. `.feature`.
    pub fn suffix(&self) -> String {
        format!("{SUFFIX_SEPARATOR}{}", self.name)
    }
}

/// Ordered collection of fragment types.
///
/// The stored sequence keeps every entry it was built from, duplicates included. Lookups go
/// through the name mapping, where a later entry shadows an earlier one with the same name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FragmentTypes {
    types: Vec<FragmentType>,
}

impl FragmentTypes {
    pub fn from_types(types: Vec<FragmentType>) -> Self {
        Self { types }
    }

    pub fn from_iterable<I>(iterable: I) -> Self
    where
        I: IntoIterator<Item = FragmentType>,
    {
        Self::from_types(iterable.into_iter().collect())
    }

    /// The seven built-in types.
    pub fn builtin() -> Self {
        Self::from_iterable(
            DEFAULT_TYPES
                .iter()
                .map(|(name, title)| FragmentType::new(*name, *title)),
        )
    }

    /// The stored sequence, in construction order.
    pub fn types(&self) -> &[FragmentType] {
        &self.types
    }

    pub fn iter(&self) -> impl Iterator<Item = &FragmentType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Merge `other` on top of `self`.
    ///
    /// Types from `other` replace same-named types of `self` in place; new names are appended.
    pub fn merge_with(&self, other: &Self) -> Self {
        let merged = merge_ordered(self.name_to_type(), other.name_to_type());
        Self::from_iterable(merged.into_iter().map(|(_, fragment_type)| fragment_type.clone()))
    }

    /// The `name -> type` mapping in insertion order.
    pub fn name_to_type(&self) -> Vec<(&str, &FragmentType)> {
        merge_ordered(
            self.types
                .iter()
                .map(|fragment_type| (fragment_type.name.as_str(), fragment_type)),
            Vec::new(),
        )
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.find_name(name).is_some()
    }

    pub fn get_name(&self, name: &str) -> Result<&FragmentType, DomainError> {
        self.find_name(name)
            .ok_or_else(|| DomainError::TypeNotFound(name.to_owned()))
    }

    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.find_suffix(suffix).is_some()
    }

    pub fn get_suffix(&self, suffix: &str) -> Result<&FragmentType, DomainError> {
        self.find_suffix(suffix)
            .ok_or_else(|| DomainError::SuffixNotFound(suffix.to_owned()))
    }

    fn find_name(&self, name: &str) -> Option<&FragmentType> {
        self.types
            .iter()
            .rev()
            .find(|fragment_type| fragment_type.name == name)
    }

    fn find_suffix(&self, suffix: &str) -> Option<&FragmentType> {
        let name = suffix.strip_prefix(SUFFIX_SEPARATOR)?;
        self.find_name(name)
    }
}

/// Ordering of fragment type groups in the rendered changelog.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Display {
    names: Vec<String>,
}

impl Display {
    pub fn from_names<S: Into<String>>(names: Vec<S>) -> Self {
        Self::from_iterable(names)
    }

    pub fn from_iterable<I, S>(iterable: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: iterable.into_iter().map(Into::into).collect(),
        }
    }

    /// Display order of the built-in types.
    pub fn builtin() -> Self {
        Self::from_iterable(DEFAULT_TYPES.iter().map(|(name, _)| *name))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Resolve every name against `types`, in order.
    ///
    /// Fails on the first name that is not registered.
    pub fn into_types<'t>(
        &self,
        types: &'t FragmentTypes,
    ) -> Result<Vec<&'t FragmentType>, DomainError> {
        self.names
            .iter()
            .map(|name| types.get_name(name))
            .collect()
    }
}

/// Issue (or pull request) number a fragment refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Issue(pub u32);

impl Issue {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single parsed changelog fragment.
///
/// Fragments are ordered by [`Issue`] alone; see [`Fragment::cmp_by_issue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub fragment_type: FragmentType,
    pub content: String,
    pub issue: Issue,
}

impl Fragment {
    pub fn new(fragment_type: FragmentType, content: impl Into<String>, issue: Issue) -> Self {
        Self {
            fragment_type,
            content: content.into(),
            issue,
        }
    }

    /// Compare by issue number only, ignoring type and content.
    pub fn cmp_by_issue(&self, other: &Self) -> Ordering {
        self.issue.cmp(&other.issue)
    }

    /// Stable sort by issue number; equal issues keep their relative order.
    pub fn sort(fragments: &mut [Fragment]) {
        fragments.sort_by(Fragment::cmp_by_issue);
    }
}
