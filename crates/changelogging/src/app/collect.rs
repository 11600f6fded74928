//! Discovering fragment files in the fragments directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::domain::fragments::{Fragment, FragmentType, FragmentTypes, Issue};

/// `<issue>.<type>` followed by an optional, ignored tail.
static FRAGMENT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<issue>[0-9]+)(?P<suffix>\.[^.]+)(?:\..*)?$")
        .expect("valid fragment name pattern")
});

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("fragments directory `{}` not found", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("failed to read fragments directory `{}`", .path.display())]
    ReadDirectory { path: PathBuf, source: io::Error },
    #[error("failed to read fragment `{}`", .path.display())]
    ReadFragment { path: PathBuf, source: io::Error },
}

/// Issue and suffix parsed from a fragment file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentName<'n> {
    pub issue: Issue,
    pub suffix: &'n str,
}

impl<'n> FragmentName<'n> {
    /// Parse `name`, returning `None` when it does not follow the naming convention.
    pub fn parse(name: &'n str) -> Option<Self> {
        let captures = FRAGMENT_NAME.captures(name)?;
        let issue = captures.name("issue")?.as_str().parse().ok()?;
        let suffix = captures.name("suffix")?.as_str();
        Some(Self {
            issue: Issue(issue),
            suffix,
        })
    }
}

/// A fragment file recognised by the collector, before its contents are read.
#[derive(Debug, Clone)]
struct Candidate<'t> {
    path: PathBuf,
    issue: Issue,
    fragment_type: &'t FragmentType,
}

/// Collects fragments from a single directory.
#[derive(Debug, Clone)]
pub struct Collector<'c> {
    directory: &'c Path,
    types: &'c FragmentTypes,
}

impl<'c> Collector<'c> {
    pub fn new(directory: &'c Path, types: &'c FragmentTypes) -> Self {
        Self { directory, types }
    }

    pub fn directory(&self) -> &Path {
        self.directory
    }

    /// Read and parse every matching fragment, in file name order.
    pub fn collect(&self) -> Result<Vec<Fragment>, CollectError> {
        self.candidates()?
            .into_iter()
            .map(|candidate| {
                let contents = fs::read_to_string(&candidate.path).map_err(|source| {
                    CollectError::ReadFragment {
                        path: candidate.path.clone(),
                        source,
                    }
                })?;
                let contents = contents.replace("\r\n", "\n");
                Ok(Fragment::new(
                    candidate.fragment_type.clone(),
                    contents.trim_end(),
                    candidate.issue,
                ))
            })
            .collect()
    }

    /// Paths of every file [`collect`](Self::collect) would consume.
    pub fn collect_paths(&self) -> Result<Vec<PathBuf>, CollectError> {
        Ok(self
            .candidates()?
            .into_iter()
            .map(|candidate| candidate.path)
            .collect())
    }

    fn candidates(&self) -> Result<Vec<Candidate<'c>>, CollectError> {
        if !self.directory.is_dir() {
            return Err(CollectError::DirectoryNotFound(self.directory.to_path_buf()));
        }

        let read_error = |source| CollectError::ReadDirectory {
            path: self.directory.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(self.directory).map_err(read_error)? {
            let entry = entry.map_err(read_error)?;
            let file_type = entry.file_type().map_err(read_error)?;
            if file_type.is_dir() {
                continue;
            }
            paths.push(entry.path());
        }
        paths.sort();

        let candidates: Vec<_> = paths
            .into_iter()
            .filter_map(|path| self.candidate(path))
            .collect();

        tracing::debug!(
            directory = %self.directory.display(),
            count = candidates.len(),
            "collected fragment candidates"
        );

        Ok(candidates)
    }

    fn candidate(&self, path: PathBuf) -> Option<Candidate<'c>> {
        let name = path.file_name()?.to_str()?;
        let parsed = FragmentName::parse(name)?;

        match self.types.get_suffix(parsed.suffix) {
            Ok(fragment_type) => Some(Candidate {
                issue: parsed.issue,
                fragment_type,
                path,
            }),
            Err(err) => {
                tracing::debug!(file = name, error = %err, "skipping fragment with unknown type");
                None
            }
        }
    }
}
