use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use pksav::{parse, LayoutProfileRegistry, NameTables, ParseOptions};

#[derive(Parser)]
struct Cli {
    #[arg(short, long)]
    sav: PathBuf,
    /// `party` or `boxN`; omit for the trainer summary only.
    #[arg(short, long)]
    location: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    let save_data = std::fs::read(&args.sav)
        .with_context(|| format!("Failed to read {}", args.sav.display()))?;
    let registry = LayoutProfileRegistry::builtin();
    let names = NameTables::builtin();
    let options = ParseOptions::new(registry.profiles(), &names);
    let parsed = parse(&save_data, args.sav.to_str(), &options)?;

    let metadata = &parsed.native_metadata;
    println!(
        "Layout: {} ({:?}, confidence {:.2}{})",
        metadata.layout_profile_id,
        metadata.sanity.level,
        metadata.layout_confidence,
        if metadata.layout_supported {
            ""
        } else {
            ", unsupported"
        }
    );
    for issue in &metadata.sanity.issues {
        println!("  ! {issue}");
    }
    if let Some(trainer) = &parsed.save_data.trainer {
        println!("Trainer Info: {trainer:?}");
    }

    match args.location.as_deref() {
        Some("party") => {
            for pkmn in &parsed.save_data.party {
                println!("{} ({})", pkmn.species(), pkmn.nickname);
            }
        }
        Some(location) if location.starts_with("box") => {
            let box_number = location[3..]
                .parse::<u8>()
                .with_context(|| format!("Invalid box location {location}"))?;
            let pc_box = parsed
                .save_data
                .pc_storage
                .as_ref()
                .and_then(|storage| storage.boxes.iter().find(|pc_box| pc_box.number == box_number))
                .with_context(|| format!("Box {box_number} not found"))?;
            for occupied in &pc_box.pokemon {
                println!("Slot {}: {}", occupied.slot, occupied.pokemon.species());
            }
        }
        Some(location) => anyhow::bail!("Unknown location {location}"),
        None => {}
    }

    Ok(())
}
