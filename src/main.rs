use clap::Parser;
use color_eyre::Result;
use tnj::{Config, Profile, cli::Cli};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev {
        Profile::Dev
    } else {
        Profile::Prod
    };

    // An explicit --config file wins over the profile's config
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load_with_profile(profile)?,
    };

    tnj::logging::init(&config.log_level);
    tracing::debug!(tasks = %config.tasks_path, notes = %config.notes_path, "configuration loaded");

    tnj::cli::run(cli.command, &config)?;

    Ok(())
}
