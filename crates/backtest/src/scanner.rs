//! Price crossing detection.
//!
//! A segment is one consecutive pair of price points: a day-pair under daily observation,
//! or a checkpoint pair under intraday observation. Within a segment every level is
//! examined once. A level is crossed from above when `from > level >= to` and from below
//! when `from < level <= to`.

use chrono::NaiveDate;
use grid_core::Direction;
use grid_ingestion::DayPath;
use serde::{Deserialize, Serialize};

use crate::levels::GridLevel;

/// One consecutive pair of price points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub day_index: usize,
    pub date: NaiveDate,
    /// Segment position within its day.
    pub step: usize,
    pub from: f64,
    pub to: f64,
}

impl Segment {
    /// Direction of travel, or `None` for a flat segment.
    pub fn direction(&self) -> Option<Direction> {
        if self.to < self.from {
            Some(Direction::Down)
        } else if self.to > self.from {
            Some(Direction::Up)
        } else {
            None
        }
    }
}

/// Result of examining one level within one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelCheck {
    pub level_index: usize,
    pub crossed: Option<Direction>,
}

/// Detects level crossings over a fixed ladder.
pub struct PriceCrossingScanner<'a> {
    levels: &'a [GridLevel],
}

impl<'a> PriceCrossingScanner<'a> {
    /// Create a scanner over a ladder sorted descending by price.
    pub fn new(levels: &'a [GridLevel]) -> Self {
        Self { levels }
    }

    /// Segments of one day, given where the previous day's path ended.
    ///
    /// The move from the previous day's last price to today's first checkpoint belongs
    /// to today. The first day has no such segment.
    pub fn segments_for_day(&self, prev_last: Option<f64>, day: &DayPath) -> Vec<Segment> {
        let mut points: Vec<f64> = Vec::with_capacity(day.checkpoints.len() + 1);
        points.extend(prev_last);
        points.extend(day.checkpoints.iter().map(|c| c.price));

        points
            .windows(2)
            .enumerate()
            .map(|(step, pair)| Segment {
                day_index: day.index,
                date: day.date,
                step,
                from: pair[0],
                to: pair[1],
            })
            .collect()
    }

    /// Examine every level against a segment.
    ///
    /// Levels are returned nearest the starting price first, walking in the direction of
    /// travel, so crossed levels come out in the order the price reached them.
    pub fn scan(&self, segment: &Segment) -> Vec<LevelCheck> {
        let check = |level: &GridLevel| LevelCheck {
            level_index: level.index,
            crossed: crossing(segment.from, segment.to, level.price),
        };

        match segment.direction() {
            Some(Direction::Up) => self.levels.iter().rev().map(check).collect(),
            Some(Direction::Down) | None => self.levels.iter().map(check).collect(),
        }
    }
}

/// Crossing test for a single level.
#[inline]
pub fn crossing(from: f64, to: f64, level: f64) -> Option<Direction> {
    if from > level && level >= to {
        Some(Direction::Down)
    } else if from < level && level <= to {
        Some(Direction::Up)
    } else {
        None
    }
}
