//! Configuration management utilities.
//!
//! Configuration lives in the `[changelogging]` table of `changelogging.toml`, or in the
//! `[tool.changelogging]` table of `pyproject.toml` when the former is absent. The built-in
//! defaults, the project file, and environment overrides are layered in that order. Fragment
//! types from the project file are merged into the default types instead of replacing them.

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::domain::fragments::{Display, FragmentType, FragmentTypes};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
const DEFAULT_CONFIG_NAME: &str = "changelogging.toml";
const PYPROJECT_NAME: &str = "pyproject.toml";
const HERE: &str = "{here}";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file `{}` not found", .0.display())]
    NotFound(PathBuf),
    #[error("fragments directory `{}` not found", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("failed to read configuration file `{}`", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse configuration `{origin}`")]
    Parse {
        origin: String,
        source: toml::de::Error,
    },
    #[error("`{}` has no `[tool.changelogging]` table", .0.display())]
    MissingTable(PathBuf),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Resolved configuration consumed by the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub name: String,
    pub version: String,
    pub url: String,
    pub directory: PathBuf,
    pub output: PathBuf,
    /// Exact line of the output file to insert entries after.
    pub start_string: String,
    pub title_format: String,
    pub issue_format: String,
    pub bullet: String,
    pub heading: char,
    pub entry_level: usize,
    pub section_level: usize,
    pub wrap: bool,
    pub wrap_size: usize,
    pub types: FragmentTypes,
    pub display: Display,
}

/// One configuration layer, every field optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Options {
    pub name: Option<String>,
    pub version: Option<String>,
    pub url: Option<String>,
    pub directory: Option<String>,
    pub output: Option<String>,
    pub start_string: Option<String>,
    pub title_format: Option<String>,
    pub issue_format: Option<String>,
    pub bullet: Option<String>,
    pub heading: Option<char>,
    pub entry_level: Option<usize>,
    pub section_level: Option<usize>,
    pub wrap: Option<bool>,
    pub wrap_size: Option<usize>,
    pub types: Option<Vec<FragmentType>>,
    pub display: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    changelogging: Options,
}

#[derive(Debug, Deserialize, Default)]
struct PyProjectFile {
    #[serde(default)]
    tool: PyProjectTools,
}

#[derive(Debug, Deserialize, Default)]
struct PyProjectTools {
    changelogging: Option<Options>,
}

fn parse_toml<T: DeserializeOwned>(contents: &str, origin: &str) -> Result<T, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::Parse {
        origin: origin.to_owned(),
        source,
    })
}

impl Options {
    /// Parse the `[changelogging]` table of a `changelogging.toml` layer.
    fn parse_layer(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        parse_toml::<ConfigFile>(contents, origin).map(|file| file.changelogging)
    }

    /// Parse the `[tool.changelogging]` table of a `pyproject.toml`, if it has one.
    fn parse_pyproject(contents: &str, origin: &str) -> Result<Option<Self>, ConfigError> {
        parse_toml::<PyProjectFile>(contents, origin).map(|file| file.tool.changelogging)
    }

    fn defaults() -> Result<Self, ConfigError> {
        Self::parse_layer(&DEFAULT_CONFIG, "built-in defaults")
    }

    fn merge(self, other: Self) -> Self {
        Self {
            name: other.name.or(self.name),
            version: other.version.or(self.version),
            url: other.url.or(self.url),
            directory: other.directory.or(self.directory),
            output: other.output.or(self.output),
            start_string: other.start_string.or(self.start_string),
            title_format: other.title_format.or(self.title_format),
            issue_format: other.issue_format.or(self.issue_format),
            bullet: other.bullet.or(self.bullet),
            heading: other.heading.or(self.heading),
            entry_level: other.entry_level.or(self.entry_level),
            section_level: other.section_level.or(self.section_level),
            wrap: other.wrap.or(self.wrap),
            wrap_size: other.wrap_size.or(self.wrap_size),
            types: merge_types(self.types, other.types),
            display: other.display.or(self.display),
        }
    }
}

fn merge_types(
    base: Option<Vec<FragmentType>>,
    overlay: Option<Vec<FragmentType>>,
) -> Option<Vec<FragmentType>> {
    match (base, overlay) {
        (Some(base), Some(overlay)) => Some(
            FragmentTypes::from_types(base)
                .merge_with(&FragmentTypes::from_types(overlay))
                .types()
                .to_vec(),
        ),
        (base, overlay) => overlay.or(base),
    }
}

/// Environment overrides for release-time values.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    version: Option<String>,
    url: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            version: env::var("CHANGELOGGING_VERSION").ok(),
            url: env::var("CHANGELOGGING_URL").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(version: &str, url: &str) -> Self {
        Self {
            version: Some(version.to_owned()),
            url: Some(url.to_owned()),
        }
    }

    fn into_options(self) -> Options {
        Options {
            version: self.version,
            url: self.url,
            ..Options::default()
        }
    }
}

impl Config {
    /// Load configuration from `path`, either a file or a directory.
    ///
    /// A directory is searched for `changelogging.toml`, then for a `pyproject.toml` with a
    /// `[tool.changelogging]` table. Without a path the current directory is used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from("."),
        };
        Self::load_with_layers(&path, EnvOverrides::from_env())
    }

    fn load_with_layers(path: &Path, env_overrides: EnvOverrides) -> Result<Self, ConfigError> {
        let (file, project) = discover(path)?;

        let options = [project, env_overrides.into_options()]
            .into_iter()
            .fold(Options::defaults()?, Options::merge);

        let config = Self::resolve(options, base_directory(&file))?;
        if !config.directory.is_dir() {
            return Err(ConfigError::DirectoryNotFound(config.directory));
        }

        tracing::debug!(config = %file.display(), "configuration loaded");
        Ok(config)
    }

    /// Build configuration from TOML text layered over the defaults, resolving paths against
    /// `base`. Unlike [`Config::load`], neither the environment nor the file system is consulted.
    pub fn from_toml_str(contents: &str, base: &Path) -> Result<Self, ConfigError> {
        let options = Options::defaults()?.merge(Options::parse_layer(contents, "<string>")?);
        Self::resolve(options, base)
    }

    fn resolve(options: Options, base: &Path) -> Result<Self, ConfigError> {
        let config = Self {
            name: required(options.name, "name")?,
            version: required(options.version, "version")?,
            url: required(options.url, "url")?,
            directory: resolve_path(&required(options.directory, "directory")?, base),
            output: resolve_path(&required(options.output, "output")?, base),
            start_string: required(options.start_string, "start_string")?,
            title_format: required(options.title_format, "title_format")?,
            issue_format: required(options.issue_format, "issue_format")?,
            bullet: required(options.bullet, "bullet")?,
            heading: required(options.heading, "heading")?,
            entry_level: positive(required(options.entry_level, "entry_level")?, "entry_level")?,
            section_level: positive(
                required(options.section_level, "section_level")?,
                "section_level",
            )?,
            wrap: required(options.wrap, "wrap")?,
            wrap_size: positive(required(options.wrap_size, "wrap_size")?, "wrap_size")?,
            types: FragmentTypes::from_types(required(options.types, "types")?),
            display: Display::from_iterable(required(options.display, "display")?),
        };

        if config.start_string.trim().is_empty() {
            return Err(ConfigError::Invalid("`start_string` must not be blank".into()));
        }

        Ok(config)
    }
}

/// Locate the configuration file for `path` and read its project layer.
fn discover(path: &Path) -> Result<(PathBuf, Options), ConfigError> {
    if !path.is_dir() {
        return Ok((path.to_path_buf(), read_layer(path)?));
    }

    let file = path.join(DEFAULT_CONFIG_NAME);
    if file.is_file() {
        let project = read_layer(&file)?;
        return Ok((file, project));
    }

    let pyproject = path.join(PYPROJECT_NAME);
    if pyproject.is_file() {
        let contents = read_file(&pyproject)?;
        if let Some(project) =
            Options::parse_pyproject(&contents, &pyproject.display().to_string())?
        {
            return Ok((pyproject, project));
        }
        tracing::debug!(path = %pyproject.display(), "no [tool.changelogging] table, skipping");
    }

    Err(ConfigError::NotFound(file))
}

fn read_layer(file: &Path) -> Result<Options, ConfigError> {
    if !file.is_file() {
        return Err(ConfigError::NotFound(file.to_path_buf()));
    }

    let contents = read_file(file)?;
    let origin = file.display().to_string();
    if file.file_name() == Some(OsStr::new(PYPROJECT_NAME)) {
        Options::parse_pyproject(&contents, &origin)?
            .ok_or_else(|| ConfigError::MissingTable(file.to_path_buf()))
    } else {
        Options::parse_layer(&contents, &origin)
    }
}

fn read_file(file: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(file).map_err(|source| ConfigError::Read {
        path: file.to_path_buf(),
        source,
    })
}

fn required<T>(value: Option<T>, key: &str) -> Result<T, ConfigError> {
    value.ok_or_else(|| ConfigError::Invalid(format!("missing `{key}`")))
}

fn positive(value: usize, key: &str) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!("`{key}` must be positive")));
    }
    Ok(value)
}

fn base_directory(file: &Path) -> &Path {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Substitute `{here}` with `base` and resolve relative paths against it.
fn resolve_path(raw: &str, base: &Path) -> PathBuf {
    let path = PathBuf::from(raw.replace(HERE, &base.display().to_string()));
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
