use serde::Serialize;

use crate::container::{unwrap_container, SourceFormat};
use crate::decode::{decode_with_profile, ProfileDecode, SaveData};
use crate::error::ParseError;
use crate::layout::{GameCode, LayoutProfile};
use crate::names::{MapResolver, NameTables};
use crate::reader::FieldReader;
use crate::sanity::{score_profile, ProfileScore, SanityLevel, SanityReport, ScoreWeights};
use crate::save::{resolve_active_slot, SlotId};

/// Lowest confidence at which a layout counts as supported.
pub const MIN_SUPPORTED_CONFIDENCE: f64 = 0.55;
/// A runner-up this close to the winner makes the choice ambiguous.
pub const AMBIGUITY_DELTA: f64 = 0.05;

#[derive(Clone, Copy)]
pub struct ParseOptions<'a> {
    pub layout_profiles: &'a [LayoutProfile],
    pub names: &'a NameTables,
    pub map_resolver: Option<&'a dyn MapResolver>,
    pub weights: ScoreWeights,
}

impl<'a> ParseOptions<'a> {
    pub fn new(layout_profiles: &'a [LayoutProfile], names: &'a NameTables) -> Self {
        ParseOptions {
            layout_profiles,
            names,
            map_resolver: None,
            weights: ScoreWeights::default(),
        }
    }

    pub fn with_map_resolver(mut self, map_resolver: &'a dyn MapResolver) -> Self {
        self.map_resolver = Some(map_resolver);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateScore {
    pub profile_id: String,
    pub confidence: f64,
    pub level: SanityLevel,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeMetadata {
    pub game: GameCode,
    pub active_slot: SlotId,
    pub save_counter: u32,
    pub encryption_key: u32,
    pub sector_order: Vec<u16>,
    pub checksum_failures: Vec<usize>,
    pub raw_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_filename: Option<String>,
    pub layout_profile_id: String,
    pub layout_confidence: f64,
    pub layout_supported: bool,
    pub sanity: SanityReport,
    pub source_format: SourceFormat,
    pub candidates: Vec<CandidateScore>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSave {
    pub save_data: SaveData,
    pub native_metadata: NativeMetadata,
}

/// The JSON envelope handed to consumers that expect a success flag.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParseReport {
    pub success: bool,
    #[serde(flatten)]
    pub save: Option<ParsedSave>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<ParsedSave, ParseError>> for ParseReport {
    fn from(result: Result<ParsedSave, ParseError>) -> Self {
        match result {
            Ok(save) => ParseReport {
                success: true,
                save: Some(save),
                error: None,
            },
            Err(err) => ParseReport {
                success: false,
                save: None,
                error: Some(err.to_string()),
            },
        }
    }
}

struct Evaluation<'p> {
    profile: &'p LayoutProfile,
    decode: ProfileDecode,
    score: ProfileScore,
}

impl Evaluation<'_> {
    fn below_flag_floor(&self) -> bool {
        self.score.report.flags_set_count < self.profile.sanity.min_flags_set
    }

    /// Higher score wins, then stable over experimental. Equal candidates keep
    /// registry order.
    fn beats(&self, other: &Evaluation<'_>) -> bool {
        (self.score.score, self.profile.support_level)
            > (other.score.score, other.profile.support_level)
    }
}

/// Decodes a save buffer under every supplied layout profile and returns the
/// most plausible result.
pub fn parse(
    buffer: &[u8],
    filename: Option<&str>,
    options: &ParseOptions<'_>,
) -> Result<ParsedSave, ParseError> {
    if options.layout_profiles.is_empty() {
        return Err(ParseError::NoProfiles);
    }

    let unwrapped = unwrap_container(buffer)?;
    log::debug!(
        "Input of {} bytes unwrapped as {:?} ({} bytes)",
        buffer.len(),
        unwrapped.format,
        unwrapped.buffer.len()
    );
    let flash = unwrapped.buffer;
    let scan = resolve_active_slot(flash)?;

    let mut evaluations = Vec::with_capacity(options.layout_profiles.len());
    for profile in options.layout_profiles {
        let reader = FieldReader::new(flash, &scan, profile)?;
        let decode = decode_with_profile(&reader, profile, options.names, options.map_resolver);
        let score = score_profile(
            &decode,
            profile,
            scan.checksum_failures.len(),
            &options.weights,
        );
        evaluations.push(Evaluation {
            profile,
            decode,
            score,
        });
    }

    let mut best_index = 0;
    for (index, evaluation) in evaluations.iter().enumerate().skip(1) {
        if evaluation.beats(&evaluations[best_index]) {
            best_index = index;
        }
    }

    let candidates: Vec<CandidateScore> = evaluations
        .iter()
        .map(|evaluation| CandidateScore {
            profile_id: evaluation.profile.id.clone(),
            confidence: evaluation.score.confidence,
            level: evaluation.score.report.level,
        })
        .collect();

    let all_below_floor = evaluations.iter().all(Evaluation::below_flag_floor);
    let runner_up = evaluations
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != best_index)
        .map(|(_, evaluation)| evaluation)
        .max_by_key(|evaluation| evaluation.score.score)
        .map(|evaluation| (evaluation.profile.id.clone(), evaluation.score.confidence));

    let best = evaluations.swap_remove(best_index);
    let confidence = best.score.confidence;
    let supported = confidence >= MIN_SUPPORTED_CONFIDENCE;
    let mut sanity = best.score.report;

    if !supported {
        log::warn!(
            "No layout profile reached confidence {MIN_SUPPORTED_CONFIDENCE}, best effort with {} ({confidence:.2})",
            best.profile.id
        );
        sanity.issues.push(format!(
            "no layout profile reached supported confidence, best was {confidence:.2}"
        ));
    }
    if all_below_floor {
        sanity
            .issues
            .push("flag offsets are likely wrong: every layout profile is below the flag floor".to_owned());
    }
    if let Some((runner_up_id, runner_up_confidence)) = runner_up {
        if confidence - runner_up_confidence <= AMBIGUITY_DELTA + f64::EPSILON {
            sanity.issues.push(format!(
                "ambiguous layout: {runner_up_id} scored {runner_up_confidence:.2} against {confidence:.2}"
            ));
        }
    }

    log::debug!(
        "Selected layout profile {} (confidence {confidence:.2}, supported {supported})",
        best.profile.id
    );

    Ok(ParsedSave {
        save_data: best.decode.save_data,
        native_metadata: NativeMetadata {
            game: best.profile.game,
            active_slot: scan.slot,
            save_counter: scan.save_counter(flash).unwrap_or_default(),
            encryption_key: best.decode.encryption_key,
            sector_order: scan.sector_order.clone(),
            checksum_failures: scan.checksum_failures.clone(),
            raw_length: buffer.len(),
            source_filename: filename.map(str::to_owned),
            layout_profile_id: best.profile.id.clone(),
            layout_confidence: confidence,
            layout_supported: supported,
            sanity,
            source_format: unwrapped.format,
            candidates,
        },
    })
}
