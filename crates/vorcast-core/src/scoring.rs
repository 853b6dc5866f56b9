// Fantasy point scoring.
//
// Converts a sparse statistical projection into fantasy points under a
// league's scoring rules. Most categories are linear (value * coefficient);
// points allowed is scored through a fixed set of bands, and field goals can
// be scored per distance range when the projection carries that split.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

// ---------------------------------------------------------------------------
// Projection types
// ---------------------------------------------------------------------------

/// Projected season stats for one player. Every category is optional: an
/// absent value is "not scored", which is different from a projected zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatProjection {
    pub passing_yards: Option<f64>,
    pub passing_tds: Option<f64>,
    pub interceptions: Option<f64>,
    pub rushing_yards: Option<f64>,
    pub rushing_tds: Option<f64>,
    pub receptions: Option<f64>,
    pub receiving_yards: Option<f64>,
    pub receiving_tds: Option<f64>,
    pub field_goals: Option<f64>,
    pub extra_points: Option<f64>,
    pub def_touchdowns: Option<f64>,
    pub def_interceptions: Option<f64>,
    pub def_fumbles: Option<f64>,
    pub def_sacks: Option<f64>,
    pub def_safeties: Option<f64>,
    pub points_allowed: Option<f64>,
    /// Made field goals split by kick distance, when the source provides it.
    pub field_goals_by_distance: Option<FieldGoalsByDistance>,
    /// Fantasy point total reported by the upstream source, if any.
    pub source_points: Option<f64>,
}

/// Made field goals per distance range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldGoalsByDistance {
    pub under_20: f64,
    pub from_20_to_29: f64,
    pub from_30_to_39: f64,
    pub from_40_to_49: f64,
    pub fifty_plus: f64,
}

impl FieldGoalsByDistance {
    fn counts(&self) -> [f64; 5] {
        [
            self.under_20,
            self.from_20_to_29,
            self.from_30_to_39,
            self.from_40_to_49,
            self.fifty_plus,
        ]
    }
}

// ---------------------------------------------------------------------------
// Linear categories
// ---------------------------------------------------------------------------

/// Stat categories scored as value * coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCategory {
    PassingYards,
    PassingTds,
    Interceptions,
    RushingYards,
    RushingTds,
    Receptions,
    ReceivingYards,
    ReceivingTds,
    ExtraPoints,
    DefTouchdowns,
    DefInterceptions,
    DefFumbles,
    DefSacks,
    DefSafeties,
}

pub const LINEAR_CATEGORIES: &[StatCategory] = &[
    StatCategory::PassingYards,
    StatCategory::PassingTds,
    StatCategory::Interceptions,
    StatCategory::RushingYards,
    StatCategory::RushingTds,
    StatCategory::Receptions,
    StatCategory::ReceivingYards,
    StatCategory::ReceivingTds,
    StatCategory::ExtraPoints,
    StatCategory::DefTouchdowns,
    StatCategory::DefInterceptions,
    StatCategory::DefFumbles,
    StatCategory::DefSacks,
    StatCategory::DefSafeties,
];

impl StatCategory {
    /// Breakdown label, matching the projection field name.
    pub fn key(&self) -> &'static str {
        match self {
            StatCategory::PassingYards => "passing_yards",
            StatCategory::PassingTds => "passing_tds",
            StatCategory::Interceptions => "interceptions",
            StatCategory::RushingYards => "rushing_yards",
            StatCategory::RushingTds => "rushing_tds",
            StatCategory::Receptions => "receptions",
            StatCategory::ReceivingYards => "receiving_yards",
            StatCategory::ReceivingTds => "receiving_tds",
            StatCategory::ExtraPoints => "extra_points",
            StatCategory::DefTouchdowns => "def_touchdowns",
            StatCategory::DefInterceptions => "def_interceptions",
            StatCategory::DefFumbles => "def_fumbles",
            StatCategory::DefSacks => "def_sacks",
            StatCategory::DefSafeties => "def_safeties",
        }
    }

    /// Scoring rule key holding this category's coefficient.
    pub fn rule_key(&self) -> &'static str {
        match self {
            StatCategory::PassingYards => "pass_yard",
            StatCategory::PassingTds => "pass_td",
            StatCategory::Interceptions => "interception",
            StatCategory::RushingYards => "rush_yard",
            StatCategory::RushingTds => "rush_td",
            StatCategory::Receptions => "reception",
            StatCategory::ReceivingYards => "rec_yard",
            StatCategory::ReceivingTds => "rec_td",
            StatCategory::ExtraPoints => "xp_made",
            StatCategory::DefTouchdowns => "def_td",
            StatCategory::DefInterceptions => "def_int",
            StatCategory::DefFumbles => "def_fumble",
            StatCategory::DefSacks => "def_sack",
            StatCategory::DefSafeties => "def_safety",
        }
    }

    pub fn value(&self, projection: &StatProjection) -> Option<f64> {
        match self {
            StatCategory::PassingYards => projection.passing_yards,
            StatCategory::PassingTds => projection.passing_tds,
            StatCategory::Interceptions => projection.interceptions,
            StatCategory::RushingYards => projection.rushing_yards,
            StatCategory::RushingTds => projection.rushing_tds,
            StatCategory::Receptions => projection.receptions,
            StatCategory::ReceivingYards => projection.receiving_yards,
            StatCategory::ReceivingTds => projection.receiving_tds,
            StatCategory::ExtraPoints => projection.extra_points,
            StatCategory::DefTouchdowns => projection.def_touchdowns,
            StatCategory::DefInterceptions => projection.def_interceptions,
            StatCategory::DefFumbles => projection.def_fumbles,
            StatCategory::DefSacks => projection.def_sacks,
            StatCategory::DefSafeties => projection.def_safeties,
        }
    }
}

// ---------------------------------------------------------------------------
// Banded tables
// ---------------------------------------------------------------------------

/// Lower bounds of the points-allowed bands. Fixed for every rule set.
pub const POINTS_ALLOWED_BANDS: [u32; 7] = [0, 1, 7, 14, 21, 28, 35];

/// Rule keys for the points-allowed bands, in band order.
pub const POINTS_ALLOWED_KEYS: [&str; 7] = [
    "points_allowed_0",
    "points_allowed_1_6",
    "points_allowed_7_13",
    "points_allowed_14_20",
    "points_allowed_21_27",
    "points_allowed_28_34",
    "points_allowed_35_plus",
];

/// Rule keys for the field-goal distance bands, in band order.
pub const FIELD_GOAL_KEYS: [&str; 5] = ["fg_0_19", "fg_20_29", "fg_30_39", "fg_40_49", "fg_50_plus"];

const DEFAULT_FIELD_GOAL_VALUES: [f64; 5] = [3.0, 3.0, 3.0, 4.0, 5.0];

/// Index of the points-allowed band for a given figure: the band whose lower
/// bound is the greatest bound <= `points_allowed`.
pub fn points_allowed_band(points_allowed: f64) -> usize {
    POINTS_ALLOWED_BANDS
        .iter()
        .rposition(|&lower| f64::from(lower) <= points_allowed)
        .unwrap_or(0)
}

/// Fantasy points awarded per points-allowed band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointsAllowedTable {
    pub values: [f64; 7],
}

impl PointsAllowedTable {
    pub fn score(&self, points_allowed: f64) -> f64 {
        self.values[points_allowed_band(points_allowed)]
    }

    /// The table must never reward a defense for allowing more points.
    pub fn is_non_increasing(&self) -> bool {
        self.values.windows(2).all(|w| w[1] <= w[0])
    }
}

/// Fantasy points per made field goal, per distance band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldGoalTable {
    pub values: [f64; 5],
}

impl Default for FieldGoalTable {
    fn default() -> Self {
        FieldGoalTable {
            values: DEFAULT_FIELD_GOAL_VALUES,
        }
    }
}

// ---------------------------------------------------------------------------
// Rule sets
// ---------------------------------------------------------------------------

/// A league's complete scoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringRules {
    /// Every rule key as supplied, including banded keys.
    pub rules: BTreeMap<String, f64>,
    pub points_allowed: PointsAllowedTable,
    /// Distance-banded field goal values; `None` when the rule set only has
    /// a flat per-kick value.
    pub field_goals: Option<FieldGoalTable>,
}

impl ScoringRules {
    /// Build and validate a rule set from a flat key -> value mapping.
    pub fn from_map(rules: BTreeMap<String, f64>) -> Result<Self, ConfigError> {
        for (key, value) in &rules {
            if !value.is_finite() {
                return Err(ConfigError::ValidationError {
                    field: format!("scoring.{key}"),
                    message: format!("must be finite, got {value}"),
                });
            }
        }

        let built = Self::build(rules);
        if !built.points_allowed.is_non_increasing() {
            return Err(ConfigError::ValidationError {
                field: "scoring.points_allowed".into(),
                message: format!(
                    "band values must not increase as points allowed increases, got {:?}",
                    built.points_allowed.values
                ),
            });
        }
        Ok(built)
    }

    /// Start from a preset and replace individual rule values.
    pub fn with_overrides(
        preset: ScoringPreset,
        overrides: &BTreeMap<String, f64>,
    ) -> Result<Self, ConfigError> {
        let mut rules = preset.rule_map();
        rules.extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
        Self::from_map(rules)
    }

    fn build(rules: BTreeMap<String, f64>) -> Self {
        let mut pa_values = [0.0; 7];
        for (slot, key) in pa_values.iter_mut().zip(POINTS_ALLOWED_KEYS) {
            *slot = rules.get(key).copied().unwrap_or(0.0);
        }

        let field_goals = if FIELD_GOAL_KEYS.iter().any(|k| rules.contains_key(*k)) {
            let mut values = DEFAULT_FIELD_GOAL_VALUES;
            for (slot, key) in values.iter_mut().zip(FIELD_GOAL_KEYS) {
                if let Some(&v) = rules.get(key) {
                    *slot = v;
                }
            }
            Some(FieldGoalTable { values })
        } else {
            None
        };

        ScoringRules {
            rules,
            points_allowed: PointsAllowedTable { values: pa_values },
            field_goals,
        }
    }

    /// Coefficient for a rule key. Absent rules score zero.
    pub fn coefficient(&self, key: &str) -> f64 {
        self.rules.get(key).copied().unwrap_or(0.0)
    }

    /// Points for a made field goal when no distance split is available:
    /// `fg_made`, else the 30-39 band value, else zero.
    pub fn flat_field_goal_value(&self) -> f64 {
        if let Some(&v) = self.rules.get("fg_made") {
            return v;
        }
        self.field_goals.map(|t| t.values[2]).unwrap_or(0.0)
    }
}

/// Named scoring presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPreset {
    Standard,
    Ppr,
    HalfPpr,
    /// The home league's own settings: full PPR, -1 per interception and
    /// distance-banded field goals.
    CustomLeague,
}

pub const COMPARISON_PRESETS: &[ScoringPreset] =
    &[ScoringPreset::Standard, ScoringPreset::Ppr, ScoringPreset::HalfPpr];

impl ScoringPreset {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "standard" => Some(ScoringPreset::Standard),
            "ppr" => Some(ScoringPreset::Ppr),
            "half_ppr" | "half-ppr" => Some(ScoringPreset::HalfPpr),
            "custom_league" | "custom" => Some(ScoringPreset::CustomLeague),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScoringPreset::Standard => "standard",
            ScoringPreset::Ppr => "ppr",
            ScoringPreset::HalfPpr => "half_ppr",
            ScoringPreset::CustomLeague => "custom_league",
        }
    }

    /// The flat rule mapping for this preset.
    pub fn rule_map(&self) -> BTreeMap<String, f64> {
        let reception = match self {
            ScoringPreset::Standard => 0.0,
            ScoringPreset::HalfPpr => 0.5,
            ScoringPreset::Ppr | ScoringPreset::CustomLeague => 1.0,
        };
        let interception = match self {
            ScoringPreset::CustomLeague => -1.0,
            _ => -2.0,
        };

        let mut pairs: Vec<(&str, f64)> = vec![
            ("pass_yard", 0.04),
            ("pass_td", 4.0),
            ("interception", interception),
            ("rush_yard", 0.1),
            ("rush_td", 6.0),
            ("reception", reception),
            ("rec_yard", 0.1),
            ("rec_td", 6.0),
            ("xp_made", 1.0),
            ("def_td", 6.0),
            ("def_int", 2.0),
            ("def_fumble", 2.0),
            ("def_sack", 1.0),
            ("def_safety", 2.0),
        ];
        let points_allowed = [10.0, 7.0, 4.0, 1.0, 0.0, -1.0, -4.0];
        pairs.extend(POINTS_ALLOWED_KEYS.iter().copied().zip(points_allowed));

        if *self == ScoringPreset::CustomLeague {
            pairs.extend(FIELD_GOAL_KEYS.iter().copied().zip(DEFAULT_FIELD_GOAL_VALUES));
        } else {
            pairs.push(("fg_made", 3.0));
        }

        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    /// The validated rule set for this preset.
    pub fn rules(&self) -> ScoringRules {
        // Preset tables are non-increasing and finite, so no validation needed.
        ScoringRules::build(self.rule_map())
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScoringError {
    #[error("malformed projection: {category} {reason}")]
    MalformedProjection { category: String, reason: String },
}

/// Whether a zero total came from real stats or from an empty projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStatus {
    Scored,
    /// The projection carried no scoreable stat, so the total is zero by
    /// construction rather than by computation.
    NoScoreableStats,
}

/// Fantasy points for one projection, with per-category line items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FantasyPoints {
    /// Total rounded to two decimals.
    pub total: f64,
    pub breakdown: BTreeMap<String, f64>,
    pub status: ScoreStatus,
}

fn malformed(category: &str, reason: String) -> ScoringError {
    ScoringError::MalformedProjection {
        category: category.to_string(),
        reason,
    }
}

/// Reject non-finite values and figures that cannot be negative.
pub fn check_projection(projection: &StatProjection) -> Result<(), ScoringError> {
    for cat in LINEAR_CATEGORIES {
        if let Some(v) = cat.value(projection) {
            if !v.is_finite() {
                return Err(malformed(cat.key(), format!("is not finite ({v})")));
            }
        }
    }
    if let Some(v) = projection.field_goals {
        if !v.is_finite() {
            return Err(malformed("field_goals", format!("is not finite ({v})")));
        }
    }
    if let Some(v) = projection.points_allowed {
        if !v.is_finite() || v < 0.0 {
            return Err(malformed(
                "points_allowed",
                format!("must be a non-negative number, got {v}"),
            ));
        }
    }
    if let Some(split) = &projection.field_goals_by_distance {
        for (count, key) in split.counts().iter().zip(FIELD_GOAL_KEYS) {
            if !count.is_finite() || *count < 0.0 {
                return Err(malformed(key, format!("must be a non-negative number, got {count}")));
            }
        }
    }
    if let Some(v) = projection.source_points {
        if !v.is_finite() {
            return Err(malformed("source_points", format!("is not finite ({v})")));
        }
    }
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score a projection under a rule set.
pub fn score(projection: &StatProjection, rules: &ScoringRules) -> Result<FantasyPoints, ScoringError> {
    check_projection(projection)?;

    let mut breakdown = BTreeMap::new();

    for cat in LINEAR_CATEGORIES {
        if let Some(v) = cat.value(projection) {
            breakdown.insert(cat.key().to_string(), v * rules.coefficient(cat.rule_key()));
        }
    }

    if let Some(split) = &projection.field_goals_by_distance {
        let table = rules.field_goals.unwrap_or_default();
        let points: f64 = split
            .counts()
            .iter()
            .zip(table.values)
            .map(|(count, value)| count * value)
            .sum();
        breakdown.insert("field_goals".to_string(), points);
    } else if let Some(made) = projection.field_goals {
        breakdown.insert("field_goals".to_string(), made * rules.flat_field_goal_value());
    }

    if let Some(pa) = projection.points_allowed {
        breakdown.insert("points_allowed".to_string(), rules.points_allowed.score(pa));
    }

    let status = if breakdown.is_empty() {
        ScoreStatus::NoScoreableStats
    } else {
        ScoreStatus::Scored
    };
    let total = round2(breakdown.values().sum());

    Ok(FantasyPoints {
        total,
        breakdown,
        status,
    })
}

/// Lenient scoring for callers that prefer a zero over an error.
pub fn score_or_zero(projection: &StatProjection, rules: &ScoringRules) -> f64 {
    match score(projection, rules) {
        Ok(points) => points.total,
        Err(e) => {
            warn!("scoring failed, using 0.0: {}", e);
            0.0
        }
    }
}

/// Score a projection under each comparison preset (standard, ppr, half_ppr).
pub fn compare_presets(
    projection: &StatProjection,
) -> Result<BTreeMap<&'static str, f64>, ScoringError> {
    let mut out = BTreeMap::new();
    for preset in COMPARISON_PRESETS {
        out.insert(preset.name(), score(projection, &preset.rules())?.total);
    }
    Ok(out)
}

/// Advisory warnings for a rule set: missing common keys, suspiciously low
/// touchdown values and keys that no projected stat feeds.
pub fn validate_rules(rules: &ScoringRules) -> Vec<String> {
    const COMMON: &[&str] = &["pass_yard", "pass_td", "rush_yard", "rush_td", "reception", "rec_yard", "rec_td"];
    let mut warnings = Vec::new();

    for key in COMMON {
        if !rules.rules.contains_key(*key) {
            warnings.push(format!("missing scoring rule: {key}"));
        }
    }

    for (key, label) in [("pass_td", "passing"), ("rush_td", "rushing"), ("rec_td", "receiving")] {
        if rules.coefficient(key) < 1.0 {
            warnings.push(format!("{label} touchdown points seem low (< 1)"));
        }
    }

    for key in rules.rules.keys() {
        let known = LINEAR_CATEGORIES.iter().any(|c| c.rule_key() == key.as_str())
            || key.as_str() == "fg_made"
            || POINTS_ALLOWED_KEYS.contains(&key.as_str())
            || FIELD_GOAL_KEYS.contains(&key.as_str());
        if !known {
            warnings.push(format!("rule `{key}` has no matching projected stat and never scores"));
        }
    }

    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
