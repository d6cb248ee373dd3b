//! Grid level generation.
//!
//! Builds the immutable ladder of price levels, with per-level sizing computed once from
//! `(level, strategy)`. The ladder is sorted descending by price and never regenerated
//! during a run. When several tiers land on the same price they share one level, and each
//! keeps its own slot with its own sizing.

use grid_core::{
    floor_to_lot, round_price, GridShape, Price, Shares, Side, StrategyConfig, TierClass,
    WidthMode,
};
use serde::{Deserialize, Serialize};

/// Prices within this distance are the same level.
pub const PRICE_EPSILON: f64 = 1e-9;

/// Nominal trade size at a level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelSizing {
    /// Lot-rounded share count.
    pub shares: Shares,
    /// `shares * price`, re-derived after rounding.
    pub amount: f64,
}

/// One tier's rung at a level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierSlot {
    pub tier: TierClass,
    pub multiplier: f64,
    /// Signed step within the tier.
    pub step: i64,
    /// Distance to the next level of the same tier, in grid units.
    pub spacing: f64,
    pub buy: LevelSizing,
    pub sell: LevelSizing,
}

/// One rung of the grid ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLevel {
    /// Position in the descending ladder.
    pub index: usize,
    pub price: f64,
    /// Offset from the reference price in grid units (percent points or currency).
    pub offset: f64,
    /// Offset from the reference price in percent.
    pub offset_pct: f64,
    /// Owning (largest) tier and its step, multiplier and spacing.
    pub step: i64,
    pub tier: TierClass,
    pub multiplier: f64,
    pub spacing: f64,
    /// Advisory label; the executed side is decided by crossing direction.
    pub nominal_role: Side,
    /// Combined sizing of all slots.
    pub buy: LevelSizing,
    pub sell: LevelSizing,
    /// Every tier with a rung at this price, largest first.
    pub slots: Vec<TierSlot>,
}

impl GridLevel {
    /// Whether `tier` has a rung at this level.
    pub fn has_tier(&self, tier: TierClass) -> bool {
        self.slots.iter().any(|slot| slot.tier == tier)
    }
}

/// Builds the grid ladder from a strategy.
pub struct GridLevelGenerator {
    config: StrategyConfig,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    tier: TierClass,
    multiplier: f64,
    step: i64,
    offset: f64,
    spacing: f64,
    price: f64,
}

impl GridLevelGenerator {
    /// Create a new generator. The config is expected to be validated.
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// Price of a grid offset, rounded, or `None` when it is not a tradable price.
    pub fn price_at_offset(&self, offset: f64) -> Option<f64> {
        let raw = match self.config.width_mode {
            WidthMode::Percentage => self.config.reference_price * (1.0 + offset / 100.0),
            WidthMode::Absolute => self.config.reference_price + offset,
        };
        let price = round_price(raw, self.config.price_precision);
        (price.is_finite() && price > 0.0).then_some(price)
    }

    /// Lot-rounded buy sizing for a tier at a price.
    pub fn buy_sizing(&self, multiplier: f64, price: f64) -> LevelSizing {
        let budget = self.config.per_tier_amount * multiplier;
        let shares = floor_to_lot(budget / price, self.config.lot_unit);
        LevelSizing {
            shares,
            amount: shares as f64 * price,
        }
    }

    /// Generate the ladder, sorted descending by price.
    ///
    /// Levels below the decline clamp or at a non-positive price are dropped. Prices
    /// produced by more than one tier collapse into a single level owned by the largest
    /// tier, carrying a slot per tier.
    pub fn generate(&self) -> Vec<GridLevel> {
        let tier_count = i64::from(self.config.tier_count);
        let upper = match self.config.shape {
            GridShape::Symmetric => tier_count,
            GridShape::DownwardOnly => 0,
        };
        let floor = self.config.decline_floor();

        let mut candidates = Vec::new();
        for (tier, multiplier) in self.config.enabled_tiers() {
            let spacing = self.config.tier_spacing(multiplier);
            for step in -tier_count..=upper {
                let offset = step as f64 * spacing;
                let Some(price) = self.price_at_offset(offset) else {
                    continue;
                };
                if floor.is_some_and(|floor| price < floor - PRICE_EPSILON) {
                    continue;
                }
                candidates.push(Candidate {
                    tier,
                    multiplier,
                    step,
                    offset,
                    spacing,
                    price,
                });
            }
        }

        candidates.sort_by(|a, b| {
            Price::from(b.price)
                .cmp(&Price::from(a.price))
                .then(b.tier.cmp(&a.tier))
        });

        let mut groups: Vec<Vec<Candidate>> = Vec::new();
        for candidate in candidates {
            match groups.last_mut() {
                Some(group) if (group[0].price - candidate.price).abs() <= PRICE_EPSILON => {
                    // One rung per tier, even if rounding folds two steps together.
                    if group.iter().all(|c| c.tier != candidate.tier) {
                        group.push(candidate);
                    }
                }
                _ => groups.push(vec![candidate]),
            }
        }

        groups
            .into_iter()
            .enumerate()
            .map(|(index, group)| self.build_level(index, &group))
            .collect()
    }

    fn build_slot(&self, c: &Candidate) -> TierSlot {
        // A sell here pairs with the same tier's buy one step below.
        let sell = if c.step > -i64::from(self.config.tier_count) {
            self.price_at_offset(c.offset - c.spacing)
                .map(|below| {
                    let shares = self.buy_sizing(c.multiplier, below).shares;
                    LevelSizing {
                        shares,
                        amount: shares as f64 * c.price,
                    }
                })
                .unwrap_or_default()
        } else {
            LevelSizing::default()
        };

        TierSlot {
            tier: c.tier,
            multiplier: c.multiplier,
            step: c.step,
            spacing: c.spacing,
            buy: self.buy_sizing(c.multiplier, c.price),
            sell,
        }
    }

    fn build_level(&self, index: usize, group: &[Candidate]) -> GridLevel {
        let owner = group[0];
        let reference = self.config.reference_price;
        let slots: Vec<TierSlot> = group.iter().map(|c| self.build_slot(c)).collect();

        let combined = |shares: Shares| LevelSizing {
            shares,
            amount: shares as f64 * owner.price,
        };
        let buy = combined(slots.iter().map(|s| s.buy.shares).sum());
        let sell = combined(slots.iter().map(|s| s.sell.shares).sum());

        GridLevel {
            index,
            price: owner.price,
            offset: owner.offset,
            offset_pct: (owner.price - reference) / reference * 100.0,
            step: owner.step,
            tier: owner.tier,
            multiplier: owner.multiplier,
            spacing: owner.spacing,
            nominal_role: if owner.offset < 0.0 { Side::Buy } else { Side::Sell },
            buy,
            sell,
            slots,
        }
    }
}

/// Whether prices strictly decrease along the ladder.
pub fn is_strictly_descending(levels: &[GridLevel]) -> bool {
    levels.windows(2).all(|w| w[0].price > w[1].price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use grid_core::{DeclineClamp, TierToggle};

    fn config() -> StrategyConfig {
        StrategyConfig {
            reference_price: 10.0,
            tier_count: 2,
            tier_width: 5.0,
            per_tier_amount: 1000.0,
            ..Default::default()
        }
    }

    fn prices(levels: &[GridLevel]) -> Vec<f64> {
        levels.iter().map(|l| l.price).collect()
    }

    #[test]
    fn test_symmetric_percentage_ladder() {
        let levels = GridLevelGenerator::new(config()).generate();
        assert_eq!(prices(&levels), vec![11.0, 10.5, 10.0, 9.5, 9.0]);
        assert!(is_strictly_descending(&levels));
        assert_eq!(levels[0].step, 2);
        assert_eq!(levels[4].step, -2);
        assert_eq!(levels[2].nominal_role, Side::Sell);
        assert_eq!(levels[3].nominal_role, Side::Buy);
        for (i, level) in levels.iter().enumerate() {
            assert_eq!(level.index, i);
        }
    }

    #[test]
    fn test_buy_sizing_rounds_to_lots() {
        let levels = GridLevelGenerator::new(config()).generate();
        let at_nine_fifty = &levels[3];
        // 1000 / 9.5 = 105.26 -> 100 shares
        assert_eq!(at_nine_fifty.buy.shares, 100);
        assert_abs_diff_eq!(at_nine_fifty.buy.amount, 950.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sell_sizing_pairs_with_step_below() {
        let levels = GridLevelGenerator::new(config()).generate();
        // Level 9.5 pairs with the buy at 9.0: 1000 / 9.0 -> 100 shares sold at 9.5.
        assert_eq!(levels[3].sell.shares, 100);
        assert_abs_diff_eq!(levels[3].sell.amount, 950.0, epsilon = 1e-9);
        // The lowest level has nothing below it.
        assert_eq!(levels[4].sell, LevelSizing::default());
    }

    #[test]
    fn test_downward_only_has_no_levels_above_reference() {
        let levels = GridLevelGenerator::new(StrategyConfig {
            shape: GridShape::DownwardOnly,
            ..config()
        })
        .generate();
        assert_eq!(prices(&levels), vec![10.0, 9.5, 9.0]);
        assert!(levels.iter().all(|l| l.offset <= 0.0));
    }

    #[test]
    fn test_absolute_mode_drops_non_positive_prices() {
        let levels = GridLevelGenerator::new(StrategyConfig {
            reference_price: 1.0,
            tier_count: 3,
            tier_width: 0.4,
            width_mode: WidthMode::Absolute,
            ..config()
        })
        .generate();
        // 1.0 - 1.2 = -0.2 is dropped; 0.2 survives.
        assert_eq!(prices(&levels), vec![2.2, 1.8, 1.4, 1.0, 0.6, 0.2]);
    }

    #[test]
    fn test_decline_clamp_drops_levels() {
        let levels = GridLevelGenerator::new(StrategyConfig {
            tier_count: 5,
            max_decline_clamp: DeclineClamp {
                enabled: true,
                percentage: 12.0,
            },
            ..config()
        })
        .generate();
        assert!(levels.iter().all(|l| l.price >= 8.8 - PRICE_EPSILON));
        assert_eq!(levels.last().map(|l| l.price), Some(9.0));
    }

    #[test]
    fn test_clamp_keeps_level_on_boundary() {
        let levels = GridLevelGenerator::new(StrategyConfig {
            max_decline_clamp: DeclineClamp {
                enabled: true,
                percentage: 10.0,
            },
            ..config()
        })
        .generate();
        assert_eq!(levels.last().map(|l| l.price), Some(9.0));
    }

    #[test]
    fn test_extra_tiers_merge_coincident_prices() {
        let levels = GridLevelGenerator::new(StrategyConfig {
            tier_count: 3,
            medium_tier: TierToggle::enabled(3.0),
            ..config()
        })
        .generate();
        assert!(is_strictly_descending(&levels));

        let reference = levels.iter().find(|l| l.price == 10.0).unwrap();
        assert_eq!(reference.tier, TierClass::Medium);

        // Small tier has 8.5 (-15%), medium has 8.5 (-15%, step -1): merged, owned by medium.
        let merged = levels.iter().find(|l| l.price == 8.5).unwrap();
        assert_eq!(merged.tier, TierClass::Medium);
        assert_eq!(merged.step, -1);
        assert_abs_diff_eq!(merged.spacing, 15.0);

        // Both tiers keep their rung: medium 3000 / 8.5 -> 300 shares, small 1000 / 8.5 -> 100.
        let slots: Vec<(TierClass, Shares)> =
            merged.slots.iter().map(|s| (s.tier, s.buy.shares)).collect();
        assert_eq!(slots, vec![(TierClass::Medium, 300), (TierClass::Small, 100)]);
        assert_eq!(merged.buy.shares, 400);
        assert!(merged.has_tier(TierClass::Small));

        // A small-only level has a single slot.
        let small_only = levels.iter().find(|l| l.price == 9.5).unwrap();
        assert_eq!(small_only.slots.len(), 1);
        assert!(!small_only.has_tier(TierClass::Medium));

        // Medium tier reaches down to -45%.
        assert_eq!(levels.last().map(|l| l.price), Some(5.5));
    }

    #[test]
    fn test_too_expensive_level_sizes_to_zero() {
        let levels = GridLevelGenerator::new(StrategyConfig {
            reference_price: 50.0,
            per_tier_amount: 1000.0,
            ..config()
        })
        .generate();
        assert!(levels.iter().all(|l| l.buy.shares == 0));
    }

    #[test]
    fn test_largest_tier_count_generates() {
        let levels = GridLevelGenerator::new(StrategyConfig {
            tier_count: grid_core::MAX_TIER_COUNT,
            tier_width: 0.05,
            medium_tier: TierToggle::enabled(3.0),
            large_tier: TierToggle::enabled(6.0),
            ..config()
        })
        .generate();
        assert!(!levels.is_empty());
        assert!(is_strictly_descending(&levels));
        assert!(levels.iter().all(|l| l.price > 0.0));
        // The small tier reaches its deepest rung at -50%.
        let deepest_small = levels.iter().find(|l| l.price == 5.0).unwrap();
        assert!(deepest_small
            .slots
            .iter()
            .any(|s| s.tier == TierClass::Small && s.step == -1000));
    }
}
