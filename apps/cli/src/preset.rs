use anyhow::{Context, Result};
use app_settings::AppSettings;
use clap::{Args, Subcommand};
use core_types::MetadataProfile;
use presets::PresetStore;
use tracing::warn;

#[derive(Subcommand)]
pub enum PresetCommand {
    /// List saved presets
    List,
    /// Print the values of one preset
    Show { name: String },
    /// Create a preset, or replace one with the same name
    Save(SaveArgs),
    /// Remove a preset
    Delete { name: String },
}

#[derive(Args)]
pub struct SaveArgs {
    name: String,
    #[arg(long, default_value = "")]
    lens_make: String,
    #[arg(long, default_value = "")]
    lens_model: String,
    #[arg(long)]
    lens_serial: Option<String>,
    /// e.g. 85 or 85mm
    #[arg(long)]
    focal_length: Option<String>,
    /// e.g. 2.8 or f/2.8
    #[arg(long)]
    aperture: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

impl SaveArgs {
    fn into_profile(self) -> MetadataProfile {
        MetadataProfile {
            name: self.name,
            lens_make: self.lens_make,
            lens_model: self.lens_model,
            lens_serial: self.lens_serial,
            focal_length: self.focal_length,
            aperture: self.aperture,
            notes: self.notes,
        }
    }
}

pub fn open_store() -> Result<PresetStore> {
    let path = app_settings::presets_path().context("locating the preset file")?;
    let store = PresetStore::open(path);
    if let Some(err) = store.load_error() {
        warn!(%err, "presets could not be read, starting with none");
    }
    Ok(store)
}

pub fn run(command: PresetCommand, settings: &mut AppSettings) -> Result<()> {
    let mut store = open_store()?;
    match command {
        PresetCommand::List => {
            let names = store.list();
            if names.is_empty() {
                println!("No presets saved in {}", store.path().display());
            }
            for name in names {
                println!("{name}");
            }
        }
        PresetCommand::Show { name } => {
            let profile = store.load(&name)?;
            print!("{}", describe(&profile));
        }
        PresetCommand::Save(args) => {
            let profile = args.into_profile();
            let name = profile.name.clone();
            store
                .save(profile)
                .with_context(|| format!("saving preset '{name}'"))?;
            println!("Saved preset '{name}'");
        }
        PresetCommand::Delete { name } => {
            store.delete(&name)?;
            if settings.last_preset.as_deref() == Some(name.as_str()) {
                settings.last_preset = None;
                if let Err(err) = settings.save() {
                    warn!(%err, "could not update settings");
                }
            }
            println!("Deleted preset '{name}'");
        }
    }
    Ok(())
}

fn describe(profile: &MetadataProfile) -> String {
    let mut out = format!("{}\n", profile.name);
    let fields = profile.fields();
    if fields.is_empty() {
        out.push_str("  (no values)\n");
    }
    for (field, value) in fields {
        out.push_str(&format!("  {:<13} {value}\n", format!("{}:", field.label())));
    }
    out
}
