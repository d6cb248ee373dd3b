//! Trade execution.
//!
//! Turns a level crossing into a concrete buy or sell: lot rounding, fees, ledger
//! mutation. The sell side branches on [`SellPolicy`].

use chrono::NaiveDate;
use grid_core::{
    floor_to_lot, Direction, SellPolicy, Shares, Side, StrategyConfig, TierClass, WidthMode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ledger::{Ledger, LotDraw};
use crate::levels::GridLevel;
use crate::scanner::Segment;
use crate::settlement::SettlementCalendar;

/// Tolerance when comparing grid offsets.
const OFFSET_EPSILON: f64 = 1e-9;

/// Immutable record of one execution, or of one blocked sell trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Position in the transaction log.
    pub seq: u64,
    pub date: NaiveDate,
    pub day_index: usize,
    /// Segment within the day that produced it.
    pub step: usize,
    pub side: Side,
    pub price: f64,
    pub shares: Shares,
    /// Gross value, `shares * price`.
    pub amount: f64,
    pub fee: f64,
    pub tier: TierClass,
    pub level_index: usize,
    pub lot_id: Option<u64>,
    /// Sells only: net proceeds minus cost basis of the shares sold.
    pub realized_pnl: f64,
    /// A sell trigger that found no available shares.
    pub blocked: bool,
}

impl Transaction {
    /// Signed cash flow: negative for a buy, positive for a sell.
    pub fn cash_flow(&self) -> f64 {
        match self.side {
            Side::Buy => -(self.amount + self.fee),
            Side::Sell => self.amount - self.fee,
        }
    }
}

/// What a trigger resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerOperation {
    /// Level not crossed in this segment.
    NotCrossed,
    Bought,
    Sold,
    /// Sell trigger with zero available shares; a blocked transaction was recorded.
    Blocked,
    /// Matching lots exist but are still pending settlement.
    Deferred,
    /// No open lot is paired with this level.
    NoEligibleLot,
    /// Dynamic policy: price not above the lowest held cost.
    BelowCost,
    /// Eligible shares exist but rounding to lots left nothing to sell.
    NothingToSell,
    /// The buy budget does not cover one lot at this price.
    BuySkipped,
}

/// Audit record of one level examined in one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    pub date: NaiveDate,
    pub day_index: usize,
    pub step: usize,
    pub from_price: f64,
    pub to_price: f64,
    pub level_index: usize,
    pub level_price: f64,
    pub tier: TierClass,
    pub crossed: bool,
    pub direction: Option<Direction>,
    pub operation: TriggerOperation,
    /// Shares bought or sold by this trigger.
    pub shares: Shares,
}

/// Result of handling one crossing.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub operation: TriggerOperation,
    pub shares: Shares,
    pub transactions: Vec<Transaction>,
}

impl Execution {
    fn without_trade(operation: TriggerOperation) -> Self {
        Self {
            operation,
            shares: 0,
            transactions: Vec::new(),
        }
    }
}

/// Executes crossings against a ledger.
pub struct TradeExecutionEngine {
    config: StrategyConfig,
    calendar: SettlementCalendar,
    next_seq: u64,
    blocked_count: u64,
}

impl TradeExecutionEngine {
    /// Create a new engine. The config is expected to be validated.
    pub fn new(config: StrategyConfig, calendar: SettlementCalendar) -> Self {
        Self {
            config,
            calendar,
            next_seq: 0,
            blocked_count: 0,
        }
    }

    /// Sell triggers that found no available shares.
    pub fn blocked_count(&self) -> u64 {
        self.blocked_count
    }

    /// Proportional fee on a gross amount.
    #[inline]
    pub fn calculate_fee(&self, amount: f64) -> f64 {
        amount * self.config.fee_rate
    }

    /// Handle a crossing of `level` in `direction` during `segment`.
    pub fn execute(
        &mut self,
        ledger: &mut Ledger,
        level: &GridLevel,
        direction: Direction,
        segment: &Segment,
    ) -> Execution {
        match direction.side() {
            Side::Buy => self.buy(ledger, level, segment),
            Side::Sell => self.sell(ledger, level, segment),
        }
    }

    /// Buy one lot per tier slot at the level, each at its own tier's size and target.
    fn buy(&mut self, ledger: &mut Ledger, level: &GridLevel, segment: &Segment) -> Execution {
        let unlock_date = self.calendar.unlock_date(segment.date);
        let mut transactions = Vec::new();
        let mut bought: Shares = 0;

        for slot in level.slots.iter().filter(|slot| slot.buy.shares > 0) {
            let shares = slot.buy.shares;
            let amount = slot.buy.amount;
            let fee = self.calculate_fee(amount);
            let lot_id = ledger.record_buy(
                shares,
                level.price,
                fee,
                segment.date,
                unlock_date,
                slot.tier,
                level.offset,
                level.offset + slot.spacing,
            );

            debug!(
                date = %segment.date,
                price = level.price,
                shares,
                fee,
                tier = slot.tier.label(),
                lot_id,
                "Grid buy"
            );

            bought += shares;
            transactions.push(Transaction {
                seq: self.take_seq(),
                date: segment.date,
                day_index: segment.day_index,
                step: segment.step,
                side: Side::Buy,
                price: level.price,
                shares,
                amount,
                fee,
                tier: slot.tier,
                level_index: level.index,
                lot_id: Some(lot_id),
                realized_pnl: 0.0,
                blocked: false,
            });
        }

        if bought == 0 {
            return Execution::without_trade(TriggerOperation::BuySkipped);
        }
        Execution {
            operation: TriggerOperation::Bought,
            shares: bought,
            transactions,
        }
    }

    fn sell(&mut self, ledger: &mut Ledger, level: &GridLevel, segment: &Segment) -> Execution {
        if ledger.available_shares() == 0 {
            return self.blocked(ledger, level, segment);
        }
        match self.config.sell_policy {
            SellPolicy::FixedMatching => self.sell_fixed_matching(ledger, level, segment),
            SellPolicy::Dynamic => self.sell_dynamic(ledger, level, segment),
        }
    }

    fn blocked(&mut self, ledger: &Ledger, level: &GridLevel, segment: &Segment) -> Execution {
        self.blocked_count += 1;
        warn!(
            date = %segment.date,
            price = level.price,
            pending = ledger.pending_shares(),
            blocked = self.blocked_count,
            "Sell trigger blocked: no available shares"
        );

        let transaction = Transaction {
            seq: self.take_seq(),
            date: segment.date,
            day_index: segment.day_index,
            step: segment.step,
            side: Side::Sell,
            price: level.price,
            shares: 0,
            amount: 0.0,
            fee: 0.0,
            tier: level.tier,
            level_index: level.index,
            lot_id: None,
            realized_pnl: 0.0,
            blocked: true,
        };
        Execution {
            operation: TriggerOperation::Blocked,
            shares: 0,
            transactions: vec![transaction],
        }
    }

    /// Sell the lots paired with this level, oldest first, at the level's price.
    fn sell_fixed_matching(
        &mut self,
        ledger: &mut Ledger,
        level: &GridLevel,
        segment: &Segment,
    ) -> Execution {
        let paired = |tier: TierClass, target: f64| {
            level.has_tier(tier) && target <= level.offset + OFFSET_EPSILON
        };

        let mut eligible = Vec::new();
        let mut deferred = false;
        for lot in ledger.lots() {
            if !paired(lot.tier, lot.target_sell_offset) {
                continue;
            }
            if lot.is_settled(segment.date) {
                eligible.push((lot.id, lot.tier, lot.shares));
            } else {
                deferred = true;
            }
        }

        if eligible.is_empty() {
            let operation = if deferred {
                TriggerOperation::Deferred
            } else {
                TriggerOperation::NoEligibleLot
            };
            return Execution::without_trade(operation);
        }

        let keep = 1.0 - self.config.retained_profit_ratio;
        let mut transactions = Vec::new();
        let mut sold: Shares = 0;
        for (lot_id, tier, lot_shares) in eligible {
            let wanted = floor_to_lot(lot_shares as f64 * keep, self.config.lot_unit)
                .min(ledger.available_shares());
            if wanted == 0 {
                continue;
            }
            if let Some(draw) = ledger.draw_from_lot(lot_id, wanted, segment.date) {
                sold += draw.shares;
                let transaction =
                    self.record_sale(ledger, level, segment, tier, &[draw], Some(lot_id));
                transactions.push(transaction);
            }
        }

        if sold == 0 {
            return Execution::without_trade(TriggerOperation::NothingToSell);
        }
        Execution {
            operation: TriggerOperation::Sold,
            shares: sold,
            transactions,
        }
    }

    /// Sell a fraction of holdings scaled by distance above the lowest held cost.
    fn sell_dynamic(&mut self, ledger: &mut Ledger, level: &GridLevel, segment: &Segment) -> Execution {
        let Some(lowest_cost) = ledger.lowest_held_cost() else {
            return Execution::without_trade(TriggerOperation::NothingToSell);
        };

        let fraction = self.dynamic_sell_fraction(level, lowest_cost);
        if fraction <= 0.0 {
            return Execution::without_trade(TriggerOperation::BelowCost);
        }

        let shares = floor_to_lot(ledger.total_shares() as f64 * fraction, self.config.lot_unit)
            .min(ledger.available_shares());
        if shares == 0 {
            return Execution::without_trade(TriggerOperation::NothingToSell);
        }

        let draws = ledger.draw_oldest_first(shares, segment.date);
        let sold: Shares = draws.iter().map(|d| d.shares).sum();
        if sold == 0 {
            return Execution::without_trade(TriggerOperation::NothingToSell);
        }
        let transaction = self.record_sale(ledger, level, segment, level.tier, &draws, None);
        Execution {
            operation: TriggerOperation::Sold,
            shares: sold,
            transactions: vec![transaction],
        }
    }

    /// Fraction of total holdings the dynamic policy sells at `level`.
    ///
    /// Distance above the lowest held cost, in base tier widths, clamped to
    /// `[0, tier_count]`, normalized, then scaled by the level's tier multiplier and
    /// capped at one.
    pub fn dynamic_sell_fraction(&self, level: &GridLevel, lowest_cost: f64) -> f64 {
        if lowest_cost <= 0.0 {
            return 0.0;
        }
        let distance = match self.config.width_mode {
            WidthMode::Percentage => (level.price - lowest_cost) / lowest_cost * 100.0,
            WidthMode::Absolute => level.price - lowest_cost,
        };
        let tier_count = self.config.tier_count as f64;
        let widths = (distance / self.config.tier_width).clamp(0.0, tier_count);
        (widths / tier_count * level.multiplier).min(1.0)
    }

    fn record_sale(
        &mut self,
        ledger: &mut Ledger,
        level: &GridLevel,
        segment: &Segment,
        tier: TierClass,
        draws: &[LotDraw],
        lot_id: Option<u64>,
    ) -> Transaction {
        let shares: Shares = draws.iter().map(|d| d.shares).sum();
        let cost: f64 = draws.iter().map(|d| d.cost).sum();
        let amount = shares as f64 * level.price;
        let fee = self.calculate_fee(amount);
        let realized_pnl = ledger.record_sell(amount, fee, cost);

        debug!(
            date = %segment.date,
            price = level.price,
            shares,
            fee,
            realized_pnl,
            tier = tier.label(),
            lots = draws.len(),
            "Grid sell"
        );

        Transaction {
            seq: self.take_seq(),
            date: segment.date,
            day_index: segment.day_index,
            step: segment.step,
            side: Side::Sell,
            price: level.price,
            shares,
            amount,
            fee,
            tier,
            level_index: level.index,
            lot_id,
            realized_pnl,
            blocked: false,
        }
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
