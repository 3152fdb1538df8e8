use std::time::Duration;

use anyhow::{Context, Result};
use app_settings::{AppSettings, ToolSettings};
use clap::Subcommand;
use metadata::{ExifTool, ToolCommand, ToolVersion};

#[derive(Subcommand)]
pub enum ToolSubcommand {
    /// Check that ExifTool runs and is recent enough
    Check,
}

pub fn run(command: ToolSubcommand, settings: &AppSettings) -> Result<()> {
    match command {
        ToolSubcommand::Check => {
            let tool = locate(&settings.exiftool)?;
            println!(
                "ExifTool {} found (minimum {}, timeout {}s)",
                tool.version(),
                settings.exiftool.minimum_version,
                tool.timeout().as_secs()
            );
            Ok(())
        }
    }
}

/// Validates the configured ExifTool once for this session.
pub fn locate(settings: &ToolSettings) -> Result<ExifTool> {
    let minimum: ToolVersion = settings.minimum_version.parse().with_context(|| {
        format!(
            "invalid minimum ExifTool version '{}' in settings",
            settings.minimum_version
        )
    })?;
    let command = tool_command(settings);
    let tool = ExifTool::locate(command.clone(), minimum).with_context(|| {
        format!("checking ExifTool at {}", command.program().display())
    })?;
    Ok(tool.with_timeout(Duration::from_secs(settings.timeout_secs)))
}

fn tool_command(settings: &ToolSettings) -> ToolCommand {
    let program = settings
        .program
        .clone()
        .unwrap_or_else(|| ToolCommand::default().program().to_path_buf());
    ToolCommand::with_args(program, settings.args.iter().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    #[test]
    fn default_settings_use_the_tool_on_path() {
        let command = tool_command(&ToolSettings::default());
        assert_eq!(command, ToolCommand::default());
    }

    #[test]
    fn configured_program_and_args_are_kept() {
        let settings = ToolSettings {
            program: Some(PathBuf::from("perl")),
            args: vec!["/opt/exiftool/exiftool".into()],
            ..ToolSettings::default()
        };
        let command = tool_command(&settings);
        assert_eq!(command.program(), Path::new("perl"));
        assert_eq!(
            command,
            ToolCommand::with_args("perl", ["/opt/exiftool/exiftool"])
        );
    }

    #[test]
    fn bad_minimum_version_is_reported() {
        let settings = ToolSettings {
            minimum_version: "latest".into(),
            ..ToolSettings::default()
        };
        let err = locate(&settings).unwrap_err();
        assert!(err.to_string().contains("invalid minimum ExifTool version"));
    }
}
