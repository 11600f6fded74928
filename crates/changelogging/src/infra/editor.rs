//! Interactive editor sessions.

use std::env;
use std::fs;
use std::io::Write;
use std::process::Command;

use anyhow::{Context, Result, bail};

const DEFAULT_EDITOR: &str = "vi";

/// Editor command resolved from `$VISUAL` or `$EDITOR`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    program: String,
    args: Vec<String>,
}

impl Editor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_env() -> Self {
        let command = ["VISUAL", "EDITOR"]
            .into_iter()
            .filter_map(|key| env::var(key).ok())
            .find(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EDITOR.to_owned());
        Self::parse(&command)
    }

    /// Split a command line such as `code --wait` on whitespace.
    pub fn parse(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(str::to_owned);
        let program = parts.next().unwrap_or_else(|| DEFAULT_EDITOR.to_owned());
        Self::new(program, parts.collect())
    }

    /// Open `initial` in the editor and return the saved text.
    ///
    /// Returns `None` when the session is closed without saving.
    pub fn edit(&self, initial: &str) -> Result<Option<String>> {
        let mut file = tempfile::Builder::new()
            .prefix("changelogging-")
            .suffix(".md")
            .tempfile()
            .context("failed to create editor scratch file")?;
        file.write_all(initial.as_bytes())
            .and_then(|()| file.flush())
            .context("failed to write editor scratch file")?;

        let path = file.path().to_path_buf();
        let before = fs::metadata(&path).and_then(|meta| meta.modified()).ok();

        tracing::debug!(program = %self.program, path = %path.display(), "launching editor");
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .status()
            .with_context(|| format!("failed to launch editor `{}`", self.program))?;
        if !status.success() {
            bail!("editor `{}` exited with {status}", self.program);
        }

        let after = fs::metadata(&path).and_then(|meta| meta.modified()).ok();
        let contents = fs::read_to_string(&path).context("failed to read editor scratch file")?;

        if before == after && contents == initial {
            return Ok(None);
        }
        Ok(Some(contents))
    }
}
