//! Run fingerprints.
//!
//! BLAKE3 digests of a run's inputs and its transaction log. Two runs over the same
//! strategy and series must produce identical fingerprints.

use grid_core::{Result, StrategyConfig};
use grid_ingestion::PriceSeries;
use serde::{Deserialize, Serialize};

use crate::execution::Transaction;

/// Hex digests identifying one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFingerprint {
    pub config_hash: String,
    pub series_hash: String,
    pub transactions_hash: String,
}

impl RunFingerprint {
    pub fn compute(
        config: &StrategyConfig,
        series: &PriceSeries,
        transactions: &[Transaction],
    ) -> Result<Self> {
        Ok(Self {
            config_hash: config_hash(config)?,
            series_hash: series_hash(series),
            transactions_hash: transactions_hash(transactions)?,
        })
    }
}

/// Digest of the canonical JSON form of a strategy.
pub fn config_hash(config: &StrategyConfig) -> Result<String> {
    let json = serde_json::to_string(config)?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}

/// Digest over every observation, in series order.
pub fn series_hash(series: &PriceSeries) -> String {
    let mut hasher = blake3::Hasher::new();
    match series {
        PriceSeries::Daily(closes) => {
            hasher.update(b"daily");
            for obs in closes {
                hasher.update(obs.date.to_string().as_bytes());
                hasher.update(&obs.close.to_le_bytes());
            }
        }
        PriceSeries::Ohlc(bars) => {
            hasher.update(b"ohlc");
            for bar in bars {
                hasher.update(bar.date.to_string().as_bytes());
                hasher.update(&bar.open.to_le_bytes());
                hasher.update(&bar.high.to_le_bytes());
                hasher.update(&bar.low.to_le_bytes());
                hasher.update(&bar.close.to_le_bytes());
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}

pub fn transactions_hash(transactions: &[Transaction]) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    for tx in transactions {
        hasher.update(&serde_json::to_vec(tx)?);
        hasher.update(b"\n");
    }
    Ok(hasher.finalize().to_hex().to_string())
}
