#[path = "../../tests/common/mod.rs"]
mod common;

use common::{SaveBuilder, VANILLA_FLAGS};
use pksav::sanity::SanityLevel;
use pktools::config::ConfigOpts;
use pktools::{audit, inspect};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn create_temp_save(save_data: &[u8]) -> NamedTempFile {
    let mut temp_save_file = NamedTempFile::new().unwrap();
    temp_save_file.write_all(save_data).unwrap();
    temp_save_file.flush().unwrap();
    temp_save_file
}

#[test]
fn test_inspect_prints_success_report() {
    let save = create_temp_save(&SaveBuilder::vanilla_emerald().build());
    let json = inspect::report(&inspect::Opts {
        sav: save.path().to_path_buf(),
        config: ConfigOpts::default(),
        pretty: false,
    })
    .unwrap();

    let report: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(report["success"], true);
    assert_eq!(report["nativeMetadata"]["layoutProfileId"], "emerald_vanilla");
    assert_eq!(report["saveData"]["money"], 3000);
}

#[test]
fn test_inspect_reports_parse_failures_as_json() {
    let mut png = vec![0x89, 0x50, 0x4e, 0x47];
    png.resize(0x400, 0);
    let save = create_temp_save(&png);
    let json = inspect::report(&inspect::Opts {
        sav: save.path().to_path_buf(),
        config: ConfigOpts::default(),
        pretty: true,
    })
    .unwrap();

    let report: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(report["success"], false);
    assert!(report["error"].as_str().unwrap().contains("PNG"));
}

#[test]
fn test_inspect_fails_on_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = inspect::report(&inspect::Opts {
        sav: dir.path().join("missing.sav"),
        config: ConfigOpts::default(),
        pretty: false,
    });
    assert!(result.is_err());
}

#[test]
fn test_profile_overrides_and_name_tables_load() {
    let dir = TempDir::new().unwrap();
    let profiles = write_file(
        dir.path(),
        "profiles.json",
        br#"[{"id": "emerald_flags_moved", "base": "emerald_vanilla",
              "override": {"supportLevel": "experimental", "saveBlock1": {"flags": 4864}}}]"#,
    );
    let flags = write_file(dir.path(), "flags.json", br#"{"FLAG_HIDE_TRUCK": 4}"#);
    let config = ConfigOpts {
        profiles: Some(profiles),
        flags: Some(flags),
        vars: None,
    };

    let registry = config.load_registry().unwrap();
    assert_eq!(registry.len(), 4);
    let derived = registry.get("emerald_flags_moved").unwrap();
    assert_eq!(derived.save_block1.flags, 0x1300);
    assert_eq!(derived.save_block1.vars, 0x139c);

    let names = config.load_names().unwrap();
    assert_eq!(names.flag_name(4), Some("FLAG_HIDE_TRUCK"));
    assert_eq!(names.flag_name(0x860), None);
    assert_eq!(names.var_name(0x4023), Some("VAR_STARTER_MON"));
}

#[test]
fn test_bad_profile_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let profiles = write_file(
        dir.path(),
        "profiles.json",
        br#"[{"id": "x", "base": "no_such_profile", "override": {}}]"#,
    );
    let config = ConfigOpts {
        profiles: Some(profiles),
        ..ConfigOpts::default()
    };
    let err = config.load_registry().unwrap_err();
    assert!(format!("{err:#}").contains("no_such_profile"));
}

#[test]
fn test_audit_tabulates_directory() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a_vanilla.sav", &SaveBuilder::vanilla_emerald().build());
    write_file(dir.path(), "b_hack.SAV", &SaveBuilder::relocated_hack().build());
    write_file(dir.path(), "c_blank.sav", &vec![0xffu8; 0x20000]);
    write_file(dir.path(), "notes.txt", b"not a save");

    let mut empty_flags = SaveBuilder::vanilla_emerald();
    empty_flags.save_block1[VANILLA_FLAGS..VANILLA_FLAGS + 300].fill(0);
    write_file(dir.path(), "d_noflags.sav", &empty_flags.build());

    let registry = ConfigOpts::default().load_registry().unwrap();
    let names = ConfigOpts::default().load_names().unwrap();
    let rows = audit::audit_dir(dir.path(), registry.profiles(), &names).unwrap();

    let files: Vec<&str> = rows.iter().map(|row| row.file.as_str()).collect();
    assert_eq!(files, ["a_vanilla.sav", "b_hack.SAV", "c_blank.sav", "d_noflags.sav"]);

    assert_eq!(rows[0].profile_id.as_deref(), Some("emerald_vanilla"));
    assert_eq!(rows[0].level, Some(SanityLevel::High));
    assert!(rows[0].supported);
    assert_eq!(rows[1].profile_id.as_deref(), Some("emerald_relocated_flags"));
    assert_eq!(rows[2].profile_id, None);
    assert!(!rows[2].supported);
    assert_eq!(rows[2].issues, ["No valid save slot found"]);
    assert!(rows[3]
        .issues
        .iter()
        .any(|issue| issue.contains("flag offsets are likely wrong")));

    let table = audit::render_table(&rows);
    assert_eq!(table.lines().count(), 5);
    assert!(table.contains("emerald_relocated_flags"));
    assert!(table.lines().nth(3).unwrap().contains("No valid save slot found"));
}

#[test]
fn test_audit_fails_on_missing_directory() {
    let dir = TempDir::new().unwrap();
    let registry = ConfigOpts::default().load_registry().unwrap();
    let names = ConfigOpts::default().load_names().unwrap();
    let result = audit::audit_dir(&dir.path().join("nope"), registry.profiles(), &names);
    assert!(result.is_err());
}
