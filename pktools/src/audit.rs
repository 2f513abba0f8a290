//! Runs every save in a directory through the parser and tabulates which
//! layout profile won, for regression checks over a save collection.

use anyhow::Context;
use clap::Args;
use pksav::sanity::SanityLevel;
use pksav::{parse, LayoutProfile, NameTables, ParseOptions};
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::config::ConfigOpts;

#[derive(Debug, Args)]
pub struct Opts {
    #[arg(short, long)]
    pub dir: PathBuf,
    #[command(flatten)]
    pub config: ConfigOpts,
    /// Print the rows as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRow {
    pub file: String,
    pub profile_id: Option<String>,
    pub confidence: Option<f64>,
    pub level: Option<SanityLevel>,
    pub supported: bool,
    pub issues: Vec<String>,
}

/// Lists the `.sav` files directly inside `dir`, sorted by name.
pub fn find_saves(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    let mut saves = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_save = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sav"));
        if path.is_file() && is_save {
            saves.push(path);
        }
    }
    saves.sort();
    Ok(saves)
}

pub fn audit_dir(
    dir: &Path,
    profiles: &[LayoutProfile],
    names: &NameTables,
) -> anyhow::Result<Vec<AuditRow>> {
    let options = ParseOptions::new(profiles, names);
    let mut rows = Vec::new();
    for path in find_saves(dir)? {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let save_data =
            std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;

        let row = match parse(&save_data, Some(file.as_str()), &options) {
            Ok(parsed) => {
                let metadata = parsed.native_metadata;
                AuditRow {
                    file,
                    profile_id: Some(metadata.layout_profile_id),
                    confidence: Some(metadata.layout_confidence),
                    level: Some(metadata.sanity.level),
                    supported: metadata.layout_supported,
                    issues: metadata.sanity.issues,
                }
            }
            Err(err) => {
                log::debug!("{file} failed to parse: {err}");
                AuditRow {
                    file,
                    profile_id: None,
                    confidence: None,
                    level: None,
                    supported: false,
                    issues: vec![err.to_string()],
                }
            }
        };
        rows.push(row);
    }
    Ok(rows)
}

pub fn render_table(rows: &[AuditRow]) -> String {
    let file_width = rows
        .iter()
        .map(|row| row.file.len())
        .chain(std::iter::once(4))
        .max()
        .unwrap_or(4);
    let mut table = String::new();
    let _ = writeln!(
        table,
        "{:<file_width$}  {:<24}  {:>10}  {:<6}  issues",
        "file", "profile", "confidence", "level"
    );
    for row in rows {
        let level = match row.level {
            Some(level) => format!("{level:?}").to_lowercase(),
            None => "-".to_owned(),
        };
        let confidence = row
            .confidence
            .map(|confidence| format!("{confidence:.2}"))
            .unwrap_or_else(|| "-".to_owned());
        let _ = writeln!(
            table,
            "{:<file_width$}  {:<24}  {:>10}  {:<6}  {}",
            row.file,
            row.profile_id.as_deref().unwrap_or("-"),
            confidence,
            level,
            row.issues.join("; ")
        );
    }
    table
}

pub fn run(opts: Opts) -> anyhow::Result<()> {
    let registry = opts.config.load_registry()?;
    let names = opts.config.load_names()?;
    let rows = audit_dir(&opts.dir, registry.profiles(), &names)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", render_table(&rows));
    }

    let unsupported = rows.iter().filter(|row| !row.supported).count();
    log::info!("{} saves audited, {unsupported} without a supported layout", rows.len());
    Ok(())
}
