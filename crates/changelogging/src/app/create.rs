//! Creating new fragment files.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::app::collect::FragmentName;
use crate::domain::errors::DomainError;
use crate::domain::fragments::FragmentTypes;

/// Body written when the editor is skipped.
pub const PLACEHOLDER: &str = "Add the content here.";

/// Initial contents of the editor session.
pub const EDIT_TEMPLATE: &str = "
# Please enter the fragment content.
# Lines starting with `#` will be ignored.
# Close the file without saving to abort.
";

const COMMENT: char = '#';

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("`{0}` is not a valid fragment name, expected `<issue>.<type>`")]
    InvalidName(String),
    #[error("unknown fragment type in `{name}`")]
    UnknownType {
        name: String,
        #[source]
        source: DomainError,
    },
    #[error("fragment `{}` already exists", .0.display())]
    AlreadyExists(PathBuf),
    #[error("failed to write fragment `{}`", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Drop comment lines and trailing whitespace from an editor session.
pub fn strip_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !line.starts_with(COMMENT))
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_start_matches('\n')
        .to_owned()
}

/// Check that `name` is a plain file name following the fragment naming convention with a
/// registered type.
pub fn validate_name(types: &FragmentTypes, name: &str) -> Result<(), CreateError> {
    if Path::new(name).file_name().and_then(|file| file.to_str()) != Some(name) {
        return Err(CreateError::InvalidName(name.to_owned()));
    }
    let parsed =
        FragmentName::parse(name).ok_or_else(|| CreateError::InvalidName(name.to_owned()))?;
    types
        .get_suffix(parsed.suffix)
        .map_err(|source| CreateError::UnknownType {
            name: name.to_owned(),
            source,
        })?;
    Ok(())
}

/// Write a new fragment named `name` into `directory`.
///
/// An existing file is never overwritten.
pub fn create(
    directory: &Path,
    types: &FragmentTypes,
    name: &str,
    body: &str,
) -> Result<PathBuf, CreateError> {
    validate_name(types, name)?;

    let path = directory.join(name);
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|source| match source.kind() {
            io::ErrorKind::AlreadyExists => CreateError::AlreadyExists(path.clone()),
            _ => CreateError::Write {
                path: path.clone(),
                source,
            },
        })?;

    writeln!(file, "{}", body.trim_end()).map_err(|source| CreateError::Write {
        path: path.clone(),
        source,
    })?;

    tracing::debug!(path = %path.display(), "fragment created");
    Ok(path)
}
