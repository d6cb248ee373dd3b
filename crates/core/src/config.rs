//! Strategy configuration for the grid backtesting system.
//!
//! Field names serialize in camelCase so a JSON strategy document uses the same option
//! names as the product surface (`referencePrice`, `tierCount`, `sellPolicy`, ...).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Shares, TierClass};

/// Largest accepted `tier_count`. Each enabled tier generates `2 * tier_count + 1` levels.
pub const MAX_TIER_COUNT: u32 = 1_000;

/// How `tier_width` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidthMode {
    /// Width in percent of the reference price.
    Percentage,
    /// Width in price units.
    Absolute,
}

/// Which side of the reference price the ladder covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GridShape {
    /// Levels below and above the reference price.
    Symmetric,
    /// Only levels at or below the reference price.
    DownwardOnly,
}

/// Sell-side policy. The two variants are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SellPolicy {
    /// Sell a fraction of holdings proportional to distance above the lowest held cost.
    Dynamic,
    /// Sell specific lots once their paired target level is reached.
    FixedMatching,
}

/// An optional extra tier (medium or large).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierToggle {
    pub enabled: bool,
    /// Scales both spacing and money amount of the tier.
    pub multiplier: f64,
}

impl TierToggle {
    /// A disabled tier with the given multiplier.
    pub fn disabled(multiplier: f64) -> Self {
        Self {
            enabled: false,
            multiplier,
        }
    }

    /// An enabled tier with the given multiplier.
    pub fn enabled(multiplier: f64) -> Self {
        Self {
            enabled: true,
            multiplier,
        }
    }
}

/// Maximum-decline clamp: levels priced below `reference * (1 - percentage/100)` are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclineClamp {
    pub enabled: bool,
    pub percentage: f64,
}

/// Complete grid strategy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrategyConfig {
    /// Price the ladder is anchored on.
    pub reference_price: f64,
    /// Number of steps on each side of the reference price.
    pub tier_count: u32,
    /// Distance between adjacent small-tier levels.
    pub tier_width: f64,
    /// Unit of `tier_width`.
    pub width_mode: WidthMode,
    /// Ladder shape.
    pub shape: GridShape,
    /// Sell-side policy.
    pub sell_policy: SellPolicy,
    /// Money committed per small-tier buy.
    pub per_tier_amount: f64,
    /// Fraction of each fixed-matching sale withheld as a retained position.
    pub retained_profit_ratio: f64,
    /// Medium tier.
    pub medium_tier: TierToggle,
    /// Large tier.
    pub large_tier: TierToggle,
    /// Optional floor on generated level prices.
    pub max_decline_clamp: DeclineClamp,
    /// Minimum tradable share increment.
    pub lot_unit: Shares,
    /// Proportional fee charged on both buys and sells.
    pub fee_rate: f64,
    /// Decimals level prices are rounded to.
    pub price_precision: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            reference_price: 1.0,
            tier_count: 5,
            tier_width: 5.0,
            width_mode: WidthMode::Percentage,
            shape: GridShape::Symmetric,
            sell_policy: SellPolicy::FixedMatching,
            per_tier_amount: 10_000.0,
            retained_profit_ratio: 0.0,
            medium_tier: TierToggle::disabled(3.0),
            large_tier: TierToggle::disabled(6.0),
            max_decline_clamp: DeclineClamp {
                enabled: false,
                percentage: 30.0,
            },
            lot_unit: 100,
            fee_rate: 0.0003,
            price_precision: 3,
        }
    }
}

impl StrategyConfig {
    /// Parse a JSON strategy document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: StrategyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot be simulated.
    pub fn validate(&self) -> Result<()> {
        if !self.reference_price.is_finite() || self.reference_price <= 0.0 {
            return Err(Error::config(format!(
                "referencePrice must be > 0, got {}",
                self.reference_price
            )));
        }
        if !(1..=MAX_TIER_COUNT).contains(&self.tier_count) {
            return Err(Error::config(format!(
                "tierCount must be within [1, {MAX_TIER_COUNT}], got {}",
                self.tier_count
            )));
        }
        if !self.tier_width.is_finite() || self.tier_width <= 0.0 {
            return Err(Error::config(format!(
                "tierWidth must be > 0, got {}",
                self.tier_width
            )));
        }
        if !self.per_tier_amount.is_finite() || self.per_tier_amount <= 0.0 {
            return Err(Error::config(format!(
                "perTierAmount must be > 0, got {}",
                self.per_tier_amount
            )));
        }
        if !(0.0..=1.0).contains(&self.retained_profit_ratio) {
            return Err(Error::config(format!(
                "retainedProfitRatio must be within [0, 1], got {}",
                self.retained_profit_ratio
            )));
        }
        if self.lot_unit == 0 {
            return Err(Error::config("lotUnit must be >= 1"));
        }
        if !(0.0..1.0).contains(&self.fee_rate) {
            return Err(Error::config(format!(
                "feeRate must be within [0, 1), got {}",
                self.fee_rate
            )));
        }
        for (name, tier) in [("mediumTier", &self.medium_tier), ("largeTier", &self.large_tier)] {
            if tier.enabled && !(tier.multiplier.is_finite() && tier.multiplier > 0.0) {
                return Err(Error::config(format!(
                    "{name}.multiplier must be > 0, got {}",
                    tier.multiplier
                )));
            }
        }
        let clamp = &self.max_decline_clamp;
        if clamp.enabled && !(clamp.percentage > 0.0 && clamp.percentage <= 100.0) {
            return Err(Error::config(format!(
                "maxDeclineClamp.percentage must be within (0, 100], got {}",
                clamp.percentage
            )));
        }
        Ok(())
    }

    /// Multiplier of a tier class, or `None` when the tier is disabled.
    pub fn tier_multiplier(&self, tier: TierClass) -> Option<f64> {
        match tier {
            TierClass::Small => Some(1.0),
            TierClass::Medium => self.medium_tier.enabled.then_some(self.medium_tier.multiplier),
            TierClass::Large => self.large_tier.enabled.then_some(self.large_tier.multiplier),
        }
    }

    /// Enabled tiers with their multipliers, smallest first.
    pub fn enabled_tiers(&self) -> Vec<(TierClass, f64)> {
        TierClass::ALL
            .iter()
            .filter_map(|&tier| self.tier_multiplier(tier).map(|m| (tier, m)))
            .collect()
    }

    /// Spacing between adjacent levels of a tier, in grid units.
    pub fn tier_spacing(&self, multiplier: f64) -> f64 {
        self.tier_width * multiplier
    }

    /// Lowest price a level may have, if the decline clamp is active.
    pub fn decline_floor(&self) -> Option<f64> {
        self.max_decline_clamp
            .enabled
            .then(|| self.reference_price * (1.0 - self.max_decline_clamp.percentage / 100.0))
    }
}
