//! Butler thresholds and their layered resolution.
//!
//! Values live in two scopes: the project (shared with everyone working on
//! the script) and the local user configuration. A project value overrides
//! the local one; a key missing from both falls back to its default.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Configuration scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigScope {
    /// Settings stored with the project.
    Project,
    /// Personal settings of the local user.
    Local,
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigScope::Project => write!(f, "project"),
            ConfigScope::Local => write!(f, "local"),
        }
    }
}

/// One of the Butler's threshold settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    LeadIn,
    LeadOut,
    SnapStartEarlier,
    SnapStartLater,
    SnapEndEarlier,
    SnapEndLater,
    Chain,
    ChainGap,
}

impl ConfigKey {
    /// All keys, in display order.
    pub const ALL: [ConfigKey; 8] = [
        ConfigKey::LeadIn,
        ConfigKey::LeadOut,
        ConfigKey::SnapStartEarlier,
        ConfigKey::SnapStartLater,
        ConfigKey::SnapEndEarlier,
        ConfigKey::SnapEndLater,
        ConfigKey::Chain,
        ConfigKey::ChainGap,
    ];

    /// Name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LeadIn => "lead_in",
            Self::LeadOut => "lead_out",
            Self::SnapStartEarlier => "snap_start_earlier",
            Self::SnapStartLater => "snap_start_later",
            Self::SnapEndEarlier => "snap_end_earlier",
            Self::SnapEndLater => "snap_end_later",
            Self::Chain => "chain",
            Self::ChainGap => "chain_gap",
        }
    }

    /// Name used by older configuration stores.
    pub fn legacy_name(&self) -> &'static str {
        match self {
            Self::LeadIn => "LeadIn",
            Self::LeadOut => "LeadOut",
            Self::SnapStartEarlier => "SnapStartEarlier",
            Self::SnapStartLater => "SnapStartLater",
            Self::SnapEndEarlier => "SnapEndEarlier",
            Self::SnapEndLater => "SnapEndLater",
            Self::Chain => "Chain",
            Self::ChainGap => "ChainGap",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LeadIn => "Lead In (if no snap) (ms)",
            Self::LeadOut => "Lead Out (if no snap) (ms)",
            Self::SnapStartEarlier => "Snap Start to Earlier Keyframe (ms)",
            Self::SnapStartLater => "Snap Start to Later Keyframe (ms)",
            Self::SnapEndEarlier => "Snap End to Earlier Keyframe (ms)",
            Self::SnapEndLater => "Snap End to Later Keyframe (ms)",
            Self::Chain => "Chain Adjacent Events (ms)",
            Self::ChainGap => "Chain Gap (frames)",
        }
    }

    /// Value used when neither scope defines the key.
    pub fn default_value(&self) -> u32 {
        match self {
            Self::LeadIn => 120,
            Self::LeadOut => 400,
            Self::SnapStartEarlier => 350,
            Self::SnapStartLater => 100,
            Self::SnapEndEarlier => 300,
            Self::SnapEndLater => 900,
            Self::Chain => 620,
            Self::ChainGap => 0,
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an unrecognised key name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown Butler setting '{0}'")]
pub struct UnknownKey(pub String);

impl FromStr for ConfigKey {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|key| key.name() == wanted || key.legacy_name() == wanted)
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

/// Resolved thresholds for one Butler invocation.
///
/// All values are milliseconds except `chain_gap`, which counts frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButlerConfig {
    /// Subtracted from the start when it is neither snapped nor chained.
    pub lead_in: u32,
    /// Upper bound of the padding added to the end of slow lines.
    pub lead_out: u32,
    /// Snap the start to an earlier keyframe closer than this.
    pub snap_start_earlier: u32,
    /// Snap the start to a later keyframe closer than this.
    pub snap_start_later: u32,
    /// Snap the end to an earlier keyframe closer than this.
    pub snap_end_earlier: u32,
    /// Act on a later keyframe after the end up to this distance.
    pub snap_end_later: u32,
    /// Chain to the previous line's end when closer than this.
    pub chain_threshold: u32,
    /// Frames left between a chained start and the previous end.
    pub chain_gap: u32,
}

impl Default for ButlerConfig {
    fn default() -> Self {
        Self {
            lead_in: ConfigKey::LeadIn.default_value(),
            lead_out: ConfigKey::LeadOut.default_value(),
            snap_start_earlier: ConfigKey::SnapStartEarlier.default_value(),
            snap_start_later: ConfigKey::SnapStartLater.default_value(),
            snap_end_earlier: ConfigKey::SnapEndEarlier.default_value(),
            snap_end_later: ConfigKey::SnapEndLater.default_value(),
            chain_threshold: ConfigKey::Chain.default_value(),
            chain_gap: ConfigKey::ChainGap.default_value(),
        }
    }
}

impl ButlerConfig {
    /// Resolve the effective thresholds from the two scopes.
    ///
    /// Per key: the project value if set, else the local value if set,
    /// else the default.
    pub fn resolve(project: &ButlerOverrides, local: &ButlerOverrides) -> Self {
        let pick = |key: ConfigKey| {
            resolve_value(project.get(key), local.get(key), key.default_value())
        };
        Self {
            lead_in: pick(ConfigKey::LeadIn),
            lead_out: pick(ConfigKey::LeadOut),
            snap_start_earlier: pick(ConfigKey::SnapStartEarlier),
            snap_start_later: pick(ConfigKey::SnapStartLater),
            snap_end_earlier: pick(ConfigKey::SnapEndEarlier),
            snap_end_later: pick(ConfigKey::SnapEndLater),
            chain_threshold: pick(ConfigKey::Chain),
            chain_gap: pick(ConfigKey::ChainGap),
        }
    }

    /// Value of a single key.
    pub fn get(&self, key: ConfigKey) -> u32 {
        match key {
            ConfigKey::LeadIn => self.lead_in,
            ConfigKey::LeadOut => self.lead_out,
            ConfigKey::SnapStartEarlier => self.snap_start_earlier,
            ConfigKey::SnapStartLater => self.snap_start_later,
            ConfigKey::SnapEndEarlier => self.snap_end_earlier,
            ConfigKey::SnapEndLater => self.snap_end_later,
            ConfigKey::Chain => self.chain_threshold,
            ConfigKey::ChainGap => self.chain_gap,
        }
    }
}

/// Merge one key across scopes: project, then local, then default.
pub fn resolve_value(project: Option<u32>, local: Option<u32>, default: u32) -> u32 {
    project.or(local).unwrap_or(default)
}

/// The values one scope defines. `None` means "not set here".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButlerOverrides {
    #[serde(default, alias = "LeadIn", deserialize_with = "lenient_value", skip_serializing_if = "Option::is_none")]
    pub lead_in: Option<u32>,

    #[serde(default, alias = "LeadOut", deserialize_with = "lenient_value", skip_serializing_if = "Option::is_none")]
    pub lead_out: Option<u32>,

    #[serde(default, alias = "SnapStartEarlier", deserialize_with = "lenient_value", skip_serializing_if = "Option::is_none")]
    pub snap_start_earlier: Option<u32>,

    #[serde(default, alias = "SnapStartLater", deserialize_with = "lenient_value", skip_serializing_if = "Option::is_none")]
    pub snap_start_later: Option<u32>,

    #[serde(default, alias = "SnapEndEarlier", deserialize_with = "lenient_value", skip_serializing_if = "Option::is_none")]
    pub snap_end_earlier: Option<u32>,

    #[serde(default, alias = "SnapEndLater", deserialize_with = "lenient_value", skip_serializing_if = "Option::is_none")]
    pub snap_end_later: Option<u32>,

    #[serde(default, alias = "Chain", deserialize_with = "lenient_value", skip_serializing_if = "Option::is_none")]
    pub chain: Option<u32>,

    #[serde(default, alias = "ChainGap", deserialize_with = "lenient_value", skip_serializing_if = "Option::is_none")]
    pub chain_gap: Option<u32>,
}

impl ButlerOverrides {
    /// Value of a key in this scope.
    pub fn get(&self, key: ConfigKey) -> Option<u32> {
        *self.slot(key)
    }

    /// Set or clear a key in this scope.
    pub fn set(&mut self, key: ConfigKey, value: Option<u32>) {
        *self.slot_mut(key) = value;
    }

    /// Keys without a value in this scope.
    pub fn missing_keys(&self) -> impl Iterator<Item = ConfigKey> + '_ {
        ConfigKey::ALL.into_iter().filter(|key| self.get(*key).is_none())
    }

    /// Whether no key is set.
    pub fn is_empty(&self) -> bool {
        self.missing_keys().count() == ConfigKey::ALL.len()
    }

    fn slot(&self, key: ConfigKey) -> &Option<u32> {
        match key {
            ConfigKey::LeadIn => &self.lead_in,
            ConfigKey::LeadOut => &self.lead_out,
            ConfigKey::SnapStartEarlier => &self.snap_start_earlier,
            ConfigKey::SnapStartLater => &self.snap_start_later,
            ConfigKey::SnapEndEarlier => &self.snap_end_earlier,
            ConfigKey::SnapEndLater => &self.snap_end_later,
            ConfigKey::Chain => &self.chain,
            ConfigKey::ChainGap => &self.chain_gap,
        }
    }

    fn slot_mut(&mut self, key: ConfigKey) -> &mut Option<u32> {
        match key {
            ConfigKey::LeadIn => &mut self.lead_in,
            ConfigKey::LeadOut => &mut self.lead_out,
            ConfigKey::SnapStartEarlier => &mut self.snap_start_earlier,
            ConfigKey::SnapStartLater => &mut self.snap_start_later,
            ConfigKey::SnapEndEarlier => &mut self.snap_end_earlier,
            ConfigKey::SnapEndLater => &mut self.snap_end_later,
            ConfigKey::Chain => &mut self.chain,
            ConfigKey::ChainGap => &mut self.chain_gap,
        }
    }
}

/// Read a stored integer, treating negative values (the old `-1`
/// fall-through marker) and out-of-range values as unset.
fn lenient_value<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.and_then(checked_value))
}

fn checked_value(raw: i64) -> Option<u32> {
    if raw < 0 {
        return None;
    }
    match u32::try_from(raw) {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring setting value {} (larger than {})", raw, u32::MAX);
            None
        }
    }
}
