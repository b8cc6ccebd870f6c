//! Memory strength estimation
//!
//! Strength decays linearly relative to the card's own interval: 100 right
//! after a review, 0 once as many whole days have passed as the interval is
//! long. Nothing here mutates a card; values are recomputed on demand.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::config::SchedulerConfig;
use super::models::Card;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Read-time memory signal for one card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStrength {
    pub card_id: String,
    /// 0-100
    pub strength: f64,
    /// 0-100
    pub confidence: f64,
    pub last_calculated: DateTime<Utc>,
}

pub fn calculate_memory_strength(card: &Card, now: DateTime<Utc>) -> f64 {
    let Some(last_reviewed) = card.last_reviewed else {
        return 0.0;
    };

    let days_since_review = (now - last_reviewed).num_days() as f64;
    let interval = f64::from(card.interval.max(1));
    let strength = 100.0 - (days_since_review / interval) * 100.0;
    strength.clamp(0.0, 100.0)
}

/// When the card's strength falls to the target threshold
pub fn get_optimal_review_time(card: &Card, now: DateTime<Utc>) -> DateTime<Utc> {
    get_optimal_review_time_with(&SchedulerConfig::default(), card, now)
}

pub fn get_optimal_review_time_with(
    config: &SchedulerConfig,
    card: &Card,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let strength = calculate_memory_strength(card, now);
    if strength <= config.target_strength {
        return now;
    }

    let days_to_optimal =
        ((strength - config.target_strength) / 100.0) * f64::from(card.interval.max(1));
    let offset = Duration::milliseconds((days_to_optimal * MILLIS_PER_DAY).round() as i64);
    now.checked_add_signed(offset).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// How many successful repetitions back up the current interval, 0-100
pub fn confidence(card: &Card) -> f64 {
    confidence_with(&SchedulerConfig::default(), card)
}

pub fn confidence_with(config: &SchedulerConfig, card: &Card) -> f64 {
    (f64::from(card.repetitions) * config.confidence_per_repetition).min(100.0)
}

pub fn memory_strength(card: &Card, now: DateTime<Utc>) -> MemoryStrength {
    memory_strength_with(&SchedulerConfig::default(), card, now)
}

pub fn memory_strength_with(
    config: &SchedulerConfig,
    card: &Card,
    now: DateTime<Utc>,
) -> MemoryStrength {
    MemoryStrength {
        card_id: card.id.clone(),
        strength: calculate_memory_strength(card, now),
        confidence: confidence_with(config, card),
        last_calculated: now,
    }
}
