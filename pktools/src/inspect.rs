use anyhow::Context;
use clap::Args;
use pksav::{parse, ParseOptions, ParseReport};
use std::path::PathBuf;

use crate::config::ConfigOpts;

#[derive(Debug, Args)]
pub struct Opts {
    #[arg(short, long)]
    pub sav: PathBuf,
    #[command(flatten)]
    pub config: ConfigOpts,
    #[arg(long)]
    pub pretty: bool,
}

/// Parses the save and renders the JSON report. A save that fails to parse is
/// still a report, only an unreadable file is an error.
pub fn report(opts: &Opts) -> anyhow::Result<String> {
    let registry = opts.config.load_registry()?;
    let names = opts.config.load_names()?;
    let save_data = std::fs::read(&opts.sav)
        .with_context(|| format!("Failed to read {}", opts.sav.display()))?;

    let filename = opts
        .sav
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned);
    let options = ParseOptions::new(registry.profiles(), &names);
    let result = parse(&save_data, filename.as_deref(), &options);
    if let Err(err) = &result {
        log::warn!("{}: {err}", opts.sav.display());
    }

    let report = ParseReport::from(result);
    let json = if opts.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    Ok(json)
}

pub fn run(opts: Opts) -> anyhow::Result<()> {
    println!("{}", report(&opts)?);
    Ok(())
}
