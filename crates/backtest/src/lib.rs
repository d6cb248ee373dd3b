//! Backtesting engine for the grid-trading system.
//!
//! This crate provides:
//! - Multi-tier grid ladder generation
//! - Level crossing detection over daily or intraday paths
//! - T+1 settlement and lot-level position accounting
//! - Buy/sell execution under fixed-matching or dynamic sell policies
//! - Daily curves, performance summary, and run fingerprints

pub mod execution;
pub mod fingerprint;
pub mod ledger;
pub mod levels;
pub mod metrics;
pub mod scanner;
pub mod settlement;
pub mod simulator;

pub use execution::{TradeExecutionEngine, Transaction, TriggerEvent, TriggerOperation};
pub use fingerprint::RunFingerprint;
pub use ledger::{Ledger, LedgerSnapshot, Lot, LotState};
pub use levels::{GridLevel, GridLevelGenerator, TierSlot};
pub use metrics::{DailyPoint, PerformanceAggregator, PerformanceSummary};
pub use scanner::{PriceCrossingScanner, Segment};
pub use settlement::{SettlementCalendar, SettlementLedger};
pub use simulator::{run_backtest, BacktestResult, BacktestSimulator};
