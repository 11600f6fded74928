use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Parser)]
#[command(author, version, about = "Project automation commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cargo nextest with default configuration
    Nextest {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        release: bool,
    },
    /// Run the test suite through cargo insta and review changed snapshots
    Snapshots {
        /// Accept all pending snapshots instead of reviewing them
        #[arg(long)]
        accept: bool,
    },
    /// Preview the next changelog entry for this repository
    Draft {
        /// Entry date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Nextest { profile, release } => run_nextest(profile, release)?,
        Commands::Snapshots { accept } => run_snapshots(accept)?,
        Commands::Draft { date } => run_draft(date)?,
    }
    Ok(())
}

fn run_nextest(profile: Option<String>, release: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("nextest").arg("run");
    if let Some(profile) = profile {
        cmd.arg("--profile").arg(profile);
    }
    if release {
        cmd.arg("--release");
    }
    run(cmd, "cargo nextest run")
}

fn run_snapshots(accept: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.args(["insta", "test", "-p", "changelogging"]);
    cmd.arg(if accept { "--accept" } else { "--review" });
    run(cmd, "cargo insta test")
}

fn run_draft(date: Option<String>) -> Result<()> {
    let root = workspace_root();
    let version = package_version(&root.join("crates/changelogging/Cargo.toml"))?;

    let mut cmd = Command::new("cargo");
    cmd.args(["run", "-q", "-p", "changelogging", "--", "build", "--draft"])
        .arg("--config")
        .arg(&root)
        .env("CHANGELOGGING_VERSION", version);
    if let Some(date) = date {
        cmd.arg("--date").arg(date);
    }
    run(cmd, "changelogging build --draft")
}

fn package_version(manifest: &Path) -> Result<String> {
    let contents = fs::read_to_string(manifest)
        .with_context(|| format!("failed to read {}", manifest.display()))?;
    let table: toml::Table = contents
        .parse()
        .with_context(|| format!("failed to parse {}", manifest.display()))?;
    table
        .get("package")
        .and_then(|package| package.get("version"))
        .and_then(toml::Value::as_str)
        .map(str::to_owned)
        .with_context(|| format!("no package version in {}", manifest.display()))
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn run(mut cmd: Command, what: &str) -> Result<()> {
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("{what} failed");
    }
    Ok(())
}
