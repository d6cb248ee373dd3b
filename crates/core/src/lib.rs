//! Core types and configuration for the grid backtesting system.
//!
//! This crate provides shared types used across all other crates:
//! - Price observation types (daily closes, OHLC bars)
//! - Trade sides, crossing directions and tier classes
//! - Strategy configuration
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    DeclineClamp, GridShape, SellPolicy, StrategyConfig, TierToggle, WidthMode, MAX_TIER_COUNT,
};
pub use error::{Error, Result};
pub use types::*;
