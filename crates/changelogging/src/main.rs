use clap::Parser;

fn main() -> anyhow::Result<()> {
    changelogging::init();

    changelogging::Cli::parse().execute()
}
