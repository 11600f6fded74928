//! Command-line interface.

use std::env;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::app::build::Builder;
use crate::app::create::{self, EDIT_TEMPLATE, PLACEHOLDER};
use crate::infra::config::Config;
use crate::infra::editor::Editor;
use crate::infra::git;

const ABORTED: &str = "Creation aborted.";

/// Build changelogs from fragments.
#[derive(Debug, Parser)]
#[command(name = "changelogging", author, version, about, long_about = None)]
pub struct Cli {
    /// Change to this directory before doing anything.
    #[arg(short = 'D', long, global = true, value_name = "DIRECTORY")]
    pub directory: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the changelog entry from fragments and write it to the output file.
    Build(BuildArgs),
    /// Create a new fragment.
    Create(CreateArgs),
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Path to `changelogging.toml` or the directory containing it.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Date of the entry (YYYY-MM-DD); defaults to today.
    #[arg(short, long, value_parser = parse_date)]
    pub date: Option<Date>,
    /// Print the entry instead of writing it.
    #[arg(short = 'p', long, visible_alias = "preview")]
    pub draft: bool,
    /// Remove consumed fragments after writing.
    #[arg(short, long, overrides_with = "no_remove")]
    pub remove: bool,
    /// Keep consumed fragments (default).
    #[arg(short = 'n', long, overrides_with = "remove")]
    pub no_remove: bool,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Path to `changelogging.toml` or the directory containing it.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Fragment content; skips the editor unless `--edit` is given.
    #[arg(short = 't', long, value_name = "TEXT")]
    pub content: Option<String>,
    /// Write the content in an editor (default without `--content`).
    #[arg(short, long, overrides_with = "no_edit")]
    pub edit: bool,
    /// Write the content or a placeholder without opening an editor.
    #[arg(short = 'n', long, overrides_with = "edit")]
    pub no_edit: bool,
    /// Stage the new fragment with `git add`.
    #[arg(short, long)]
    pub add: bool,
    /// Fragment file name, e.g. `42.feature`.
    pub name: String,
}

impl CreateArgs {
    fn opens_editor(&self) -> bool {
        if self.edit {
            true
        } else if self.no_edit {
            false
        } else {
            self.content.is_none()
        }
    }
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        if let Some(directory) = &self.directory {
            env::set_current_dir(directory).with_context(|| {
                format!("failed to change the current directory to `{}`", directory.display())
            })?;
        }

        match self.command {
            Commands::Build(args) => build(args),
            Commands::Create(args) => create_fragment(args),
            Commands::Completions { shell } => {
                let mut command = Cli::command();
                clap_complete::generate(shell, &mut command, "changelogging", &mut io::stdout());
                Ok(())
            }
        }
    }
}

fn build(args: BuildArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    let date = args.date.unwrap_or_else(today);
    let builder = Builder::new(&config, date)?;

    if args.draft {
        println!("{}", builder.render()?);
        return Ok(());
    }

    let consumed = builder.write()?;
    if args.remove && !args.no_remove {
        git::remove_paths(&consumed)?;
    }
    Ok(())
}

fn create_fragment(args: CreateArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    create::validate_name(&config.types, &args.name)?;

    let body = if args.opens_editor() {
        let initial = match &args.content {
            Some(content) => format!("{content}{EDIT_TEMPLATE}"),
            None => EDIT_TEMPLATE.to_owned(),
        };
        match Editor::from_env().edit(&initial)? {
            Some(text) => create::strip_comments(&text),
            None => {
                println!("{ABORTED}");
                return Ok(());
            }
        }
    } else {
        args.content
            .clone()
            .unwrap_or_else(|| PLACEHOLDER.to_owned())
    };

    let path = create::create(&config.directory, &config.types, &args.name, &body)?;
    println!("Created the `{}` fragment.", args.name);

    if args.add {
        git::add_paths(&[path]).context("failed to stage the new fragment")?;
    }
    Ok(())
}

fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}

fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}
