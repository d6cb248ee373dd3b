//! Price series ingestion for the grid backtesting system.
//!
//! This crate handles:
//! - Validation of already-fetched daily close and OHLC series
//! - JSON loading of those series
//! - Per-day checkpoint path reconstruction (daily or intraday)

pub mod checkpoints;
pub mod loader;
pub mod series;

pub use checkpoints::{build_day_paths, Checkpoint, CheckpointKind, DayPath, ObservationModel};
pub use loader::{load_series_json, parse_series_json};
pub use series::PriceSeries;
