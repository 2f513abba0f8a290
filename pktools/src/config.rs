//! Layout profiles and name tables, from the builtin set plus optional JSON
//! files given on the command line.

use anyhow::Context;
use clap::Args;
use pksav::names::table_from_json;
use pksav::{LayoutProfileRegistry, NameTables};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Args)]
pub struct ConfigOpts {
    /// JSON list of `{id, base, override}` profile overrides.
    #[arg(long)]
    pub profiles: Option<PathBuf>,
    /// JSON `{"FLAG_NAME": id}` table replacing the builtin flag names.
    #[arg(long)]
    pub flags: Option<PathBuf>,
    /// JSON `{"VAR_NAME": id}` table replacing the builtin var names.
    #[arg(long)]
    pub vars: Option<PathBuf>,
}

impl ConfigOpts {
    pub fn load_registry(&self) -> anyhow::Result<LayoutProfileRegistry> {
        let mut registry = LayoutProfileRegistry::builtin();
        if let Some(path) = &self.profiles {
            let added = registry
                .load_overrides(&read_text(path)?)
                .with_context(|| format!("Invalid layout profiles in {}", path.display()))?;
            log::info!("Loaded {added} layout profiles from {}", path.display());
        }
        Ok(registry)
    }

    pub fn load_names(&self) -> anyhow::Result<NameTables> {
        let mut names = NameTables::builtin();
        if let Some(path) = &self.flags {
            names.flags = table_from_json(&read_text(path)?)
                .with_context(|| format!("Invalid flag table in {}", path.display()))?;
        }
        if let Some(path) = &self.vars {
            names.vars = table_from_json(&read_text(path)?)
                .with_context(|| format!("Invalid var table in {}", path.display()))?;
        }
        Ok(names)
    }
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
