//! Backtest simulator.
//!
//! Replays a price series against a grid strategy. The ladder is generated once; each day
//! first releases due settlement, then scans its segments for crossings and executes them
//! in path order; the aggregator records end-of-day curves.

use grid_core::{Result, StrategyConfig};
use grid_ingestion::{build_day_paths, ObservationModel, PriceSeries};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::execution::{TradeExecutionEngine, Transaction, TriggerEvent, TriggerOperation};
use crate::ledger::{Ledger, LedgerSnapshot, Lot};
use crate::levels::{GridLevel, GridLevelGenerator};
use crate::metrics::{DailyPoint, PerformanceAggregator, PerformanceSummary};
use crate::scanner::PriceCrossingScanner;
use crate::settlement::SettlementCalendar;

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub observation: ObservationModel,
    pub levels: Vec<GridLevel>,
    pub transactions: Vec<Transaction>,
    pub triggers: Vec<TriggerEvent>,
    pub daily: Vec<DailyPoint>,
    pub summary: PerformanceSummary,
    pub open_lots: Vec<Lot>,
    pub final_ledger: LedgerSnapshot,
}

/// Grid backtest simulator.
#[derive(Debug, Clone)]
pub struct BacktestSimulator {
    config: StrategyConfig,
    observation: ObservationModel,
}

impl BacktestSimulator {
    /// Create a new simulator, rejecting invalid configurations.
    pub fn new(config: StrategyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            observation: ObservationModel::Daily,
        })
    }

    /// Use a different observation model.
    pub fn with_observation(mut self, observation: ObservationModel) -> Self {
        self.observation = observation;
        self
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// The ladder this simulator trades.
    pub fn levels(&self) -> Vec<GridLevel> {
        GridLevelGenerator::new(self.config.clone()).generate()
    }

    /// Replay `series` and return the full result.
    pub fn run(&self, series: &PriceSeries) -> Result<BacktestResult> {
        series.validate()?;

        let levels = self.levels();
        info!(
            levels = levels.len(),
            observations = series.len(),
            policy = ?self.config.sell_policy,
            observation = ?self.observation,
            "Starting grid backtest"
        );

        let scanner = PriceCrossingScanner::new(&levels);
        let mut engine =
            TradeExecutionEngine::new(self.config.clone(), SettlementCalendar::new(series.dates()));
        let mut ledger = Ledger::new();
        let mut aggregator = PerformanceAggregator::new();
        let mut transactions: Vec<Transaction> = Vec::new();
        let mut triggers: Vec<TriggerEvent> = Vec::new();

        let mut prev_last: Option<f64> = None;
        for day in build_day_paths(series, self.observation) {
            ledger.settle(day.date);

            for segment in scanner.segments_for_day(prev_last, &day) {
                for check in scanner.scan(&segment) {
                    let level = &levels[check.level_index];
                    let (operation, shares) = match check.crossed {
                        Some(direction) => {
                            let execution = engine.execute(&mut ledger, level, direction, &segment);
                            transactions.extend(execution.transactions);
                            (execution.operation, execution.shares)
                        }
                        None => (TriggerOperation::NotCrossed, 0),
                    };
                    triggers.push(TriggerEvent {
                        date: segment.date,
                        day_index: segment.day_index,
                        step: segment.step,
                        from_price: segment.from,
                        to_price: segment.to,
                        level_index: level.index,
                        level_price: level.price,
                        tier: level.tier,
                        crossed: check.crossed.is_some(),
                        direction: check.crossed,
                        operation,
                        shares,
                    });
                }
            }

            debug_assert!(ledger.is_consistent(day.date));
            aggregator.record_day(day.date, day.close, &ledger);
            prev_last = Some(day.last_price());
        }

        let (summary, daily) = aggregator.finish(&transactions, &ledger);
        info!(
            transactions = summary.transaction_count,
            blocked = engine.blocked_count(),
            net_investment = summary.net_investment,
            profit = summary.profit_amount,
            "Grid backtest finished"
        );

        Ok(BacktestResult {
            observation: self.observation,
            levels,
            transactions,
            triggers,
            daily,
            summary,
            open_lots: ledger.lots().to_vec(),
            final_ledger: ledger.snapshot(),
        })
    }
}

/// Validate, build and run in one call.
pub fn run_backtest(
    config: StrategyConfig,
    series: &PriceSeries,
    observation: ObservationModel,
) -> Result<BacktestResult> {
    BacktestSimulator::new(config)?
        .with_observation(observation)
        .run(series)
}
