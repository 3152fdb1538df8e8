mod display;
mod import;
mod preset;
mod tool;

use anyhow::Result;
use app_settings::AppSettings;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Copy photos off a card into date folders and tag them with lens data",
    long_about = None
)]
struct Cli {
    /// Log debug detail to stderr (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import files into date-named folders
    Import(import::ImportArgs),
    /// Manage saved metadata presets
    #[command(subcommand)]
    Preset(preset::PresetCommand),
    /// Inspect the ExifTool installation
    #[command(subcommand)]
    Tool(tool::ToolSubcommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = AppSettings::load().unwrap_or_else(|err| {
        warn!(%err, "could not read settings, using defaults");
        AppSettings::default()
    });

    match cli.command {
        Command::Import(args) => import::run(args, &mut settings),
        Command::Preset(command) => preset::run(command, &mut settings),
        Command::Tool(command) => tool::run(command, &settings),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use core_types::OrganizeMode;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_import_flags() {
        let cli = Cli::try_parse_from([
            "photo-import",
            "-v",
            "import",
            "/card/DCIM",
            "--dest",
            "/photos",
            "--mode",
            "import-date",
            "--preset",
            "Helios",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Command::Import(args) => {
                assert_eq!(args.sources.len(), 1);
                assert_eq!(args.mode, Some(OrganizeMode::ImportDate));
                assert_eq!(args.preset.as_deref(), Some("Helios"));
            }
            _ => panic!("expected import"),
        }
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["photo-import", "import", "--mode", "weekly"]).is_err());
    }
}
