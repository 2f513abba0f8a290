use thiserror::Error;

/// Structural failures that stop a parse. Everything else is reported through
/// the sanity report of a successful parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Save buffer too small: {len} bytes, expected at least {min}")]
    TooSmall { len: usize, min: usize },
    #[error("Input is a PNG image (screenshot?), not a save file")]
    PngArtifact,
    #[error("No valid save slot found")]
    NoValidSlot,
    #[error("Missing section 0 (trainer data) in the active save slot")]
    MissingSection0,
    #[error("No layout profiles supplied")]
    NoProfiles,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("duplicate layout profile id `{0}`")]
    DuplicateId(String),
    #[error("unknown base layout profile `{0}`")]
    UnknownBase(String),
    #[error("layout profile override for `{0}` must be a JSON object")]
    OverrideNotObject(String),
    #[error("layout profile `{id}` has {flag_bytes} flag bytes, at most 8192 are addressable")]
    FlagBytesTooLarge { id: String, flag_bytes: u16 },
    #[error("malformed layout profile: {0}")]
    Json(#[from] serde_json::Error),
}
