#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub const MARKER: &str = "<!-- changelogging: start -->";

/// Temporary project with a `changelogging.toml`, a `changes/` directory, and a changelog.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new(config: &str) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::create_dir_all(dir.path().join("changes")).expect("changes dir");
        fs::write(dir.path().join("changelogging.toml"), config).expect("config");
        fs::write(
            dir.path().join("CHANGELOG.md"),
            format!("# Changelog\n\n{MARKER}\n\n## 0.1.0 (2024-01-01)\n\nNo significant changes.\n"),
        )
        .expect("changelog");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn fragment(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root().join("changes").join(name);
        fs::write(&path, contents).expect("fragment");
        path
    }

    pub fn changelog(&self) -> String {
        fs::read_to_string(self.root().join("CHANGELOG.md")).expect("changelog")
    }
}

pub const BASIC_CONFIG: &str = r#"
[changelogging]
name = "tests"
version = "1.0.0"
url = "https://x.dev"
directory = "{here}/changes"
output = "{here}/CHANGELOG.md"
wrap_size = 40
"#;
