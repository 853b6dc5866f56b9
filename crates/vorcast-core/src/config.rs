// Configuration loading and parsing (league.toml).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ingest::UnknownPositionPolicy;
use crate::player::{Position, RosterSlot, DEFAULT_FLEX_ELIGIBLE};
use crate::scoring::{ScoringPreset, ScoringRules};
use crate::valuation::replacement::{ReplacementBaseline, RosterConstruction};
use crate::valuation::vor::ScarcityMultipliers;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub valuation: ValuationConfig,
    pub data_paths: DataPaths,
}

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// League settings: size, scoring and per-team starting lineup.
#[derive(Debug, Clone, PartialEq)]
pub struct LeagueConfig {
    pub name: String,
    pub num_teams: usize,
    pub scoring_preset: ScoringPreset,
    pub scoring: ScoringRules,
    /// Starters per team, keyed by slot. Bench and IR entries are dropped.
    pub roster: BTreeMap<RosterSlot, usize>,
    pub flex_eligible: Vec<Position>,
    /// League-wide slot counts that replace `roster * num_teams` entirely.
    pub roster_override: Option<BTreeMap<RosterSlot, usize>>,
}

impl LeagueConfig {
    /// A league using a preset's scoring and the usual one-QB lineup
    /// (QB, 2 RB, 2 WR, TE, FLEX, K, DST).
    pub fn with_preset(name: &str, num_teams: usize, preset: ScoringPreset) -> Self {
        LeagueConfig {
            name: name.to_string(),
            num_teams,
            scoring_preset: preset,
            scoring: preset.rules(),
            roster: RosterConstruction::default().slots,
            flex_eligible: DEFAULT_FLEX_ELIGIBLE.to_vec(),
            roster_override: None,
        }
    }

    /// League-wide roster construction for a ranking request.
    pub fn roster_construction(
        &self,
        num_teams: usize,
        include_flex: bool,
    ) -> Result<RosterConstruction, ConfigError> {
        let roster = match &self.roster_override {
            Some(slots) => RosterConstruction::league_wide(slots.clone(), &self.flex_eligible),
            None => RosterConstruction::from_per_team(
                &self.roster,
                num_teams,
                include_flex,
                &self.flex_eligible,
            )
            .ok_or_else(|| {
                invalid(
                    "league.num_teams",
                    format!("{num_teams} teams overflows the league-wide roster size"),
                )
            })?,
        };
        check_flex(&roster.slots, &roster.flex_eligible)?;
        Ok(roster)
    }
}

/// Valuation knobs that are independent of league rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationConfig {
    pub include_flex: bool,
    pub replacement_baseline: ReplacementBaseline,
    pub unknown_position: UnknownPositionPolicy,
    pub scarcity: ScarcityMultipliers,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        ValuationConfig {
            include_flex: true,
            replacement_baseline: ReplacementBaseline::default(),
            unknown_position: UnknownPositionPolicy::default(),
            scarcity: ScarcityMultipliers::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataPaths {
    pub projections: String,
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths {
            projections: "data/projections.csv".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire league.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    league: LeagueSection,
    #[serde(default)]
    valuation: ValuationSection,
    #[serde(default)]
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
struct LeagueSection {
    name: String,
    num_teams: usize,
    #[serde(default)]
    scoring: ScoringSection,
    roster: BTreeMap<String, usize>,
    #[serde(default)]
    flex: Option<FlexSection>,
    #[serde(default)]
    roster_override: Option<BTreeMap<String, usize>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScoringSection {
    preset: String,
    #[serde(default)]
    overrides: BTreeMap<String, f64>,
}

impl Default for ScoringSection {
    fn default() -> Self {
        ScoringSection {
            preset: "standard".into(),
            overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct FlexSection {
    eligible: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ValuationSection {
    #[serde(default = "default_true")]
    include_flex: bool,
    #[serde(default)]
    replacement_baseline: ReplacementBaseline,
    #[serde(default = "default_unknown_position")]
    unknown_position: String,
    #[serde(default)]
    scarcity: BTreeMap<String, f64>,
}

impl Default for ValuationSection {
    fn default() -> Self {
        ValuationSection {
            include_flex: true,
            replacement_baseline: ReplacementBaseline::default(),
            unknown_position: default_unknown_position(),
            scarcity: BTreeMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_unknown_position() -> String {
    "reject".into()
}

/// Keys under `[league.roster]` that hold non-starters.
const NON_STARTER_KEYS: &[&str] = &["BN", "BE", "BENCH", "IR", "IL"];

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` relative to
/// the given `base_dir`.
///
/// Does not copy defaults; call `ensure_config_files` first when `config/`
/// may not exist yet.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let league_path = base_dir.join("config").join("league.toml");
    let text = read_file(&league_path)?;
    parse_config(&text).map_err(|e| match e {
        ParseFailure::Toml(source) => ConfigError::ParseError {
            path: league_path.clone(),
            source,
        },
        ParseFailure::Invalid(err) => err,
    })
}

/// Parse and validate league.toml contents.
pub fn parse_config_str(text: &str) -> Result<Config, ConfigError> {
    parse_config(text).map_err(|e| match e {
        ParseFailure::Toml(source) => ConfigError::ParseError {
            path: PathBuf::from("<string>"),
            source,
        },
        ParseFailure::Invalid(err) => err,
    })
}

enum ParseFailure {
    Toml(toml::de::Error),
    Invalid(ConfigError),
}

fn parse_config(text: &str) -> Result<Config, ParseFailure> {
    let file: ConfigFile = toml::from_str(text).map_err(ParseFailure::Toml)?;
    assemble(file).map_err(ParseFailure::Invalid)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or pass --config-dir",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn parse_position(field: &str, raw: &str) -> Result<Position, ConfigError> {
    Position::from_str_pos(raw).ok_or_else(|| invalid(field, format!("unknown position `{raw}`")))
}

fn parse_roster(
    field: &str,
    raw: &BTreeMap<String, usize>,
) -> Result<BTreeMap<RosterSlot, usize>, ConfigError> {
    let mut slots = BTreeMap::new();
    for (key, &count) in raw {
        if NON_STARTER_KEYS.contains(&key.trim().to_uppercase().as_str()) {
            continue;
        }
        let slot = RosterSlot::from_key(key)
            .ok_or_else(|| invalid(format!("{field}.{key}"), "unknown roster slot"))?;
        *slots.entry(slot).or_insert(0) += count;
    }
    Ok(slots)
}

fn check_flex(slots: &BTreeMap<RosterSlot, usize>, eligible: &[Position]) -> Result<(), ConfigError> {
    let flex = slots.get(&RosterSlot::Flex).copied().unwrap_or(0);
    if flex > 0 && eligible.is_empty() {
        return Err(invalid(
            "league.flex.eligible",
            "must name at least one position when FLEX slots are configured",
        ));
    }
    Ok(())
}

fn assemble(file: ConfigFile) -> Result<Config, ConfigError> {
    let league = file.league;

    let scoring_preset = ScoringPreset::from_name(&league.scoring.preset).ok_or_else(|| {
        invalid(
            "league.scoring.preset",
            format!("unknown preset `{}`", league.scoring.preset),
        )
    })?;
    let scoring = ScoringRules::with_overrides(scoring_preset, &league.scoring.overrides)?;

    let roster = parse_roster("league.roster", &league.roster)?;
    let roster_override = league
        .roster_override
        .as_ref()
        .map(|raw| parse_roster("league.roster_override", raw))
        .transpose()?;

    let flex_eligible = match &league.flex {
        Some(flex) => flex
            .eligible
            .iter()
            .map(|p| parse_position("league.flex.eligible", p))
            .collect::<Result<Vec<_>, _>>()?,
        None => DEFAULT_FLEX_ELIGIBLE.to_vec(),
    };

    let mut scarcity = ScarcityMultipliers::default();
    for (key, &value) in &file.valuation.scarcity {
        let field = format!("valuation.scarcity.{key}");
        let pos = parse_position(&field, key)?;
        scarcity.set(pos, value);
    }

    let unknown_position = UnknownPositionPolicy::from_config_str(&file.valuation.unknown_position)
        .ok_or_else(|| {
            invalid(
                "valuation.unknown_position",
                format!(
                    "expected \"reject\" or a position, got `{}`",
                    file.valuation.unknown_position
                ),
            )
        })?;

    let config = Config {
        league: LeagueConfig {
            name: league.name,
            num_teams: league.num_teams,
            scoring_preset,
            scoring,
            roster,
            flex_eligible,
            roster_override,
        },
        valuation: ValuationConfig {
            include_flex: file.valuation.include_flex,
            replacement_baseline: file.valuation.replacement_baseline,
            unknown_position,
            scarcity,
        },
        data_paths: file.data_paths,
    };

    validate(&config)?;

    Ok(config)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.num_teams == 0 {
        return Err(invalid("league.num_teams", "must be greater than 0"));
    }

    check_flex(&config.league.roster, &config.league.flex_eligible)?;
    if let Some(slots) = &config.league.roster_override {
        check_flex(slots, &config.league.flex_eligible)?;
    }

    for (pos, &value) in config.valuation.scarcity.iter() {
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid(
                format!("valuation.scarcity.{pos}"),
                format!("must be a positive number, got {value}"),
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
