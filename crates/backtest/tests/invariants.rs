//! Property tests for ladder and ledger invariants.
//!
//! Uses proptest to verify:
//! 1. Ladders are strictly descending, positive, and respect the decline clamp
//! 2. Share buckets always reconcile: total == available + pending
//! 3. Traded quantities are whole lots and blocked sells trade nothing
//! 4. Net investment in the summary matches a recomputation from the log

use chrono::{Days, NaiveDate};
use grid_backtest::levels::is_strictly_descending;
use grid_backtest::metrics::net_investment_from_log;
use grid_backtest::{run_backtest, BacktestResult, GridLevelGenerator};
use grid_core::{
    DailyClose, DeclineClamp, OhlcBar, SellPolicy, Side, StrategyConfig, TierToggle, WidthMode,
};
use grid_ingestion::{ObservationModel, PriceSeries};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_config() -> impl Strategy<Value = StrategyConfig> {
    (
        1u32..8,
        0.5..10.0_f64,
        prop::bool::ANY,
        prop::bool::ANY,
        prop::option::of(5.0..60.0_f64),
        prop::bool::ANY,
        0.0..0.6_f64,
    )
        .prop_map(
            |(tier_count, width, medium, dynamic, clamp, large, retained)| StrategyConfig {
                reference_price: 10.0,
                tier_count,
                tier_width: (width * 10.0).round() / 10.0,
                width_mode: WidthMode::Percentage,
                sell_policy: if dynamic {
                    SellPolicy::Dynamic
                } else {
                    SellPolicy::FixedMatching
                },
                per_tier_amount: 5000.0,
                retained_profit_ratio: (retained * 10.0).round() / 10.0,
                medium_tier: if medium {
                    TierToggle::enabled(3.0)
                } else {
                    TierToggle::disabled(3.0)
                },
                large_tier: if large {
                    TierToggle::enabled(6.0)
                } else {
                    TierToggle::disabled(6.0)
                },
                max_decline_clamp: DeclineClamp {
                    enabled: clamp.is_some(),
                    percentage: clamp.unwrap_or(30.0),
                },
                ..Default::default()
            },
        )
}

fn arb_walk() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.06..0.06_f64, 1..40).prop_map(|steps| {
        let mut price = 10.0_f64;
        steps
            .into_iter()
            .map(|step| {
                price = (price * (1.0 + step)).max(0.5);
                (price * 100.0).round() / 100.0
            })
            .collect()
    })
}

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .checked_add_days(Days::new(i as u64))
        .unwrap()
}

fn daily_series(closes: &[f64]) -> PriceSeries {
    PriceSeries::Daily(
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| DailyClose { date: day(i), close })
            .collect(),
    )
}

fn ohlc_series(closes: &[f64], wick: f64) -> PriceSeries {
    let mut open = 10.0;
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let bar = OhlcBar {
                date: day(i),
                open,
                high: open.max(close) + wick,
                low: (open.min(close) - wick).max(0.01),
                close,
            };
            open = close;
            bar
        })
        .collect();
    PriceSeries::Ohlc(bars)
}

fn check_run(result: &BacktestResult, lot_unit: u64) -> Result<(), TestCaseError> {
    for point in &result.daily {
        prop_assert_eq!(
            point.total_shares,
            point.available_shares + point.pending_shares
        );
        prop_assert_eq!(point.total_shares % lot_unit, 0);
    }
    for tx in &result.transactions {
        prop_assert_eq!(tx.shares % lot_unit, 0);
        if tx.blocked {
            prop_assert_eq!(tx.side, Side::Sell);
            prop_assert_eq!(tx.shares, 0);
            prop_assert_eq!(tx.amount, 0.0);
        } else {
            prop_assert!(tx.shares > 0);
        }
    }
    let recomputed = net_investment_from_log(&result.transactions);
    prop_assert!((result.summary.net_investment - recomputed).abs() < 1e-6);

    let held: u64 = result.open_lots.iter().map(|l| l.shares).sum();
    prop_assert_eq!(held, result.summary.total_shares);
    Ok(())
}

// ── 1. Ladder shape ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn ladder_is_strictly_descending(config in arb_config()) {
        let levels = GridLevelGenerator::new(config.clone()).generate();
        prop_assert!(is_strictly_descending(&levels));
        prop_assert!(levels.iter().all(|l| l.price > 0.0));
        for (i, level) in levels.iter().enumerate() {
            prop_assert_eq!(level.index, i);
        }
        if let Some(floor) = config.decline_floor() {
            prop_assert!(levels.iter().all(|l| l.price >= floor - 1e-9));
        }
    }
}

// ── 2-4. Run invariants ──────────────────────────────────────────────

proptest! {
    #[test]
    fn daily_runs_keep_invariants(config in arb_config(), closes in arb_walk()) {
        let lot_unit = config.lot_unit;
        let result = run_backtest(config, &daily_series(&closes), ObservationModel::Daily)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(result.daily.len(), closes.len());
        check_run(&result, lot_unit)?;
    }

    #[test]
    fn intraday_runs_keep_invariants(
        config in arb_config(),
        closes in arb_walk(),
        wick in 0.0..0.8_f64,
    ) {
        let lot_unit = config.lot_unit;
        let series = ohlc_series(&closes, (wick * 100.0).round() / 100.0);
        let result = run_backtest(config, &series, ObservationModel::Intraday)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        check_run(&result, lot_unit)?;

        // Nothing bought on the final day can have settled.
        if let Some(last) = result.daily.last() {
            let bought_last_day: u64 = result
                .transactions
                .iter()
                .filter(|t| t.side == Side::Buy && t.date == last.date)
                .map(|t| t.shares)
                .sum();
            prop_assert!(last.pending_shares >= bought_last_day);
        }
    }
}
