//! Master/slave pairing records and copy settings.

use crate::AccountId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a slave's volume is derived from the master's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeMode {
    /// Slave volume is the `multiplier` value verbatim.
    Fixed,
    /// Slave volume scales with the slave/master balance ratio.
    Percent,
    /// Slave volume is master volume times `multiplier`.
    #[default]
    Multiply,
}

impl fmt::Display for VolumeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Percent => write!(f, "percent"),
            Self::Multiply => write!(f, "multiply"),
        }
    }
}

/// Copy settings for one pairing.
///
/// This is the single canonical shape. Stored pairings written by older
/// frontends use camelCase names for the same fields; those are accepted
/// as serde aliases here and never looked up anywhere else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairSettings {
    /// Translate the master's symbol into the slave broker's naming.
    #[serde(default = "default_true", alias = "autoMapSymbol")]
    pub auto_map_symbol: bool,
    /// Correct volume for differing contract sizes (multiply mode).
    #[serde(default = "default_true", alias = "autoMapVolume")]
    pub auto_map_volume: bool,
    /// Carry SL/TP levels over to the slave.
    #[serde(default = "default_true", alias = "copyPSL", alias = "copy_psl")]
    pub copy_stop_take: bool,
    /// Volume derivation mode.
    #[serde(default, alias = "volumeMode")]
    pub volume_mode: VolumeMode,
    /// Mode-dependent factor: lots (fixed), ratio scale (percent), or
    /// plain multiplier (multiply).
    #[serde(default = "default_multiplier", alias = "volumeMultiplier")]
    pub multiplier: Decimal,
}

fn default_true() -> bool {
    true
}

fn default_multiplier() -> Decimal {
    Decimal::ONE
}

impl Default for PairSettings {
    fn default() -> Self {
        Self {
            auto_map_symbol: true,
            auto_map_volume: true,
            copy_stop_take: true,
            volume_mode: VolumeMode::default(),
            multiplier: Decimal::ONE,
        }
    }
}

/// Whether a pairing participates in fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairStatus {
    #[default]
    Active,
    Inactive,
}

/// A persisted master→slave copy relationship.
///
/// Many pairings may share one subscription key; the
/// `(master, slave, key)` triple is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pairing {
    /// Stable pairing id.
    pub id: String,
    /// Account whose signals are copied.
    pub master_account: AccountId,
    /// Account that receives the derived commands.
    pub slave_account: AccountId,
    /// Opaque bearer key signals arrive under.
    pub subscription_key: String,
    /// Active pairings participate in fan-out.
    #[serde(default)]
    pub status: PairStatus,
    /// Copy settings.
    #[serde(default)]
    pub settings: PairSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pairing {
    pub fn is_active(&self) -> bool {
        self.status == PairStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_settings_camel_case_aliases() {
        let json = r#"{
            "autoMapSymbol": false,
            "autoMapVolume": true,
            "copyPSL": false,
            "volumeMode": "percent",
            "volumeMultiplier": "2.5"
        }"#;

        let settings: PairSettings = serde_json::from_str(json).unwrap();
        assert!(!settings.auto_map_symbol);
        assert!(settings.auto_map_volume);
        assert!(!settings.copy_stop_take);
        assert_eq!(settings.volume_mode, VolumeMode::Percent);
        assert_eq!(settings.multiplier, dec!(2.5));
    }

    #[test]
    fn test_settings_defaults() {
        let settings: PairSettings = serde_json::from_str("{}").unwrap();
        assert!(settings.auto_map_symbol);
        assert!(settings.auto_map_volume);
        assert!(settings.copy_stop_take);
        assert_eq!(settings.volume_mode, VolumeMode::Multiply);
        assert_eq!(settings.multiplier, Decimal::ONE);
    }

    #[test]
    fn test_volume_mode_wire_names() {
        assert_eq!(
            serde_json::from_str::<VolumeMode>(r#""fixed""#).unwrap(),
            VolumeMode::Fixed
        );
        assert_eq!(VolumeMode::Multiply.to_string(), "multiply");
    }
}
