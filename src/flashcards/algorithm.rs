//! SM-2 Spaced Repetition Algorithm
//!
//! Variant of the SuperMemo 2 algorithm used to schedule card reviews.
//! Grades map to the classic 0-5 scale as Again = 0, Hard = 3, Good = 4,
//! Easy = 5. The ease factor update uses that numeric value on both the
//! correct and the lapse branch.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::config::SchedulerConfig;
use super::models::{Card, ReviewQuality, ReviewResponse};

/// Result of scheduling one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReview {
    pub card: Card,
    pub next_review_date: DateTime<Utc>,
    pub interval_days: u32,
}

/// Schedule the next review of a card with the default configuration
pub fn schedule_next_review(
    card: &Card,
    quality: ReviewQuality,
    now: DateTime<Utc>,
) -> ScheduledReview {
    schedule_next_review_with(&SchedulerConfig::default(), card, quality, now)
}

/// Schedule the next review of a card
///
/// Stored state is not trusted: the ease factor is clamped to the floor and
/// a zero interval is read as one day before anything is computed.
pub fn schedule_next_review_with(
    config: &SchedulerConfig,
    card: &Card,
    quality: ReviewQuality,
    now: DateTime<Utc>,
) -> ScheduledReview {
    let ease_factor = sanitize_ease_factor(config, card.ease_factor);
    let interval = card.interval.max(1);

    let (interval, repetitions) = if quality.is_correct() {
        let next = match card.repetitions {
            0 => config.initial_interval,
            1 => config.second_interval,
            _ => grow_interval(interval, ease_factor),
        };
        (next, card.repetitions.saturating_add(1))
    } else {
        (config.initial_interval, 0)
    };

    // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
    let q = f64::from(5 - quality.value());
    let ease_factor = (ease_factor + (0.1 - q * (0.08 + q * 0.02))).max(config.min_ease_factor);

    let interval = interval.max(1);
    let due_date = add_days(now, interval);

    log::debug!(
        "Scheduled card {} ({}): interval {} -> {}, ease {:.2} -> {:.2}",
        card.id,
        quality,
        card.interval,
        interval,
        card.ease_factor,
        ease_factor
    );

    let updated = Card {
        interval,
        repetitions,
        ease_factor,
        due_date,
        last_reviewed: Some(now),
        ..card.clone()
    };

    ScheduledReview {
        card: updated,
        next_review_date: due_date,
        interval_days: interval,
    }
}

fn sanitize_ease_factor(config: &SchedulerConfig, ease_factor: f64) -> f64 {
    if ease_factor.is_finite() {
        ease_factor.max(config.min_ease_factor)
    } else {
        config.initial_ease_factor.max(config.min_ease_factor)
    }
}

fn grow_interval(interval: u32, ease_factor: f64) -> u32 {
    let grown = (f64::from(interval) * ease_factor).round();
    if grown >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        grown as u32
    }
}

/// `now` plus a whole number of days, saturating at the end of representable time
fn add_days(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(days))
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Apply responses to a card collection with the default configuration
pub fn batch_update_cards(
    cards: &[Card],
    responses: &[ReviewResponse],
    now: DateTime<Utc>,
) -> Vec<Card> {
    batch_update_cards_with(&SchedulerConfig::default(), cards, responses, now)
}

/// Apply responses to a card collection
///
/// Each card with a response is scheduled independently; cards without one
/// come back unchanged and in their original order. If a card id appears in
/// several responses the last one wins.
pub fn batch_update_cards_with(
    config: &SchedulerConfig,
    cards: &[Card],
    responses: &[ReviewResponse],
    now: DateTime<Utc>,
) -> Vec<Card> {
    let grades = latest_grades(responses);

    cards
        .iter()
        .map(|card| match grades.get(card.id.as_str()) {
            Some(&quality) => schedule_next_review_with(config, card, quality, now).card,
            None => card.clone(),
        })
        .collect()
}

/// Collapse responses to one grade per card id, keeping the last
pub(crate) fn latest_grades(responses: &[ReviewResponse]) -> HashMap<&str, ReviewQuality> {
    let mut grades = HashMap::with_capacity(responses.len());
    for response in responses {
        grades.insert(response.card_id.as_str(), response.quality);
    }
    grades
}

/// Calculate the preview intervals for each grade
/// Used to show users what interval each button would give
pub fn preview_intervals(card: &Card, now: DateTime<Utc>) -> [u32; 4] {
    preview_intervals_with(&SchedulerConfig::default(), card, now)
}

pub fn preview_intervals_with(
    config: &SchedulerConfig,
    card: &Card,
    now: DateTime<Utc>,
) -> [u32; 4] {
    ReviewQuality::ALL
        .map(|quality| schedule_next_review_with(config, card, quality, now).interval_days)
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: u32) -> String {
    if days == 0 {
        "now".to_string()
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ALL: [ReviewQuality; 4] = ReviewQuality::ALL;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn new_card() -> Card {
        Card::new("card-1", "el perro", "the dog", now())
    }

    fn card_with(interval: u32, repetitions: u32, ease_factor: f64) -> Card {
        Card {
            interval,
            repetitions,
            ease_factor,
            last_reviewed: Some(now() - Duration::days(i64::from(interval))),
            ..new_card()
        }
    }

    #[test]
    fn test_first_review_good() {
        let result = schedule_next_review(&new_card(), ReviewQuality::Good, now());

        assert_eq!(result.card.interval, 1);
        assert_eq!(result.card.repetitions, 1);
        assert!((result.card.ease_factor - 2.5).abs() < 1e-9);
        assert_eq!(result.card.due_date, now() + Duration::days(1));
        assert_eq!(result.next_review_date, now() + Duration::days(1));
        assert_eq!(result.interval_days, 1);
        assert_eq!(result.card.last_reviewed, Some(now()));
    }

    #[test]
    fn test_second_review_good() {
        let first = schedule_next_review(&new_card(), ReviewQuality::Good, now());
        let later = now() + Duration::days(1);
        let second = schedule_next_review(&first.card, ReviewQuality::Good, later);

        assert_eq!(second.card.interval, 6);
        assert_eq!(second.card.repetitions, 2);
        assert_eq!(second.next_review_date, later + Duration::days(6));
    }

    #[test]
    fn test_subsequent_review_uses_previous_ease() {
        let card = card_with(10, 5, 2.5);
        let result = schedule_next_review(&card, ReviewQuality::Good, now());

        // 10 * 2.5 = 25
        assert_eq!(result.card.interval, 25);
        assert_eq!(result.card.repetitions, 6);

        // Hard lowers the ease factor, but the interval still grows with the old one
        let hard = schedule_next_review(&card, ReviewQuality::Hard, now());
        assert_eq!(hard.card.interval, 25);
        assert!((hard.card.ease_factor - 2.36).abs() < 1e-9);
    }

    #[test]
    fn test_interval_rounds() {
        let card = card_with(7, 3, 1.3);
        let result = schedule_next_review(&card, ReviewQuality::Easy, now());
        // 7 * 1.3 = 9.1
        assert_eq!(result.card.interval, 9);
        assert!((result.card.ease_factor - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_lapse_resets() {
        let card = card_with(10, 3, 2.5);
        let result = schedule_next_review(&card, ReviewQuality::Again, now());

        assert_eq!(result.card.repetitions, 0);
        assert_eq!(result.card.interval, 1);
        // 2.5 + (0.1 - 5 * (0.08 + 5 * 0.02)) = 1.7
        assert!((result.card.ease_factor - 1.7).abs() < 1e-9);
        assert!(result.card.ease_factor < 2.5);
        assert!(result.card.ease_factor >= 1.3);
    }

    #[test]
    fn test_first_success_ignores_ease() {
        for ease in [1.3, 1.8, 2.5, 3.7] {
            for quality in [ReviewQuality::Hard, ReviewQuality::Good, ReviewQuality::Easy] {
                let card = Card {
                    ease_factor: ease,
                    ..new_card()
                };
                let result = schedule_next_review(&card, quality, now());
                assert_eq!(result.card.interval, 1);
                assert_eq!(result.card.repetitions, 1);
            }
        }
    }

    #[test]
    fn test_second_success_is_six_days() {
        for interval in [1, 3, 40] {
            for quality in [ReviewQuality::Hard, ReviewQuality::Good, ReviewQuality::Easy] {
                let result = schedule_next_review(&card_with(interval, 1, 2.0), quality, now());
                assert_eq!(result.card.interval, 6);
            }
        }
    }

    #[test]
    fn test_ease_floor_holds_over_sequences() {
        let mut card = new_card();
        let mut at = now();
        let sequence = [
            ReviewQuality::Again,
            ReviewQuality::Again,
            ReviewQuality::Hard,
            ReviewQuality::Again,
            ReviewQuality::Hard,
            ReviewQuality::Hard,
            ReviewQuality::Hard,
            ReviewQuality::Again,
            ReviewQuality::Easy,
            ReviewQuality::Good,
        ];
        for quality in sequence.iter().chain(sequence.iter()) {
            let result = schedule_next_review(&card, *quality, at);
            assert!(result.card.ease_factor >= 1.3);
            assert!(result.card.interval >= 1);
            at = result.next_review_date;
            card = result.card;
        }
    }

    #[test]
    fn test_repeated_lapses_stop_at_floor() {
        let mut card = card_with(10, 4, 1.4);
        for _ in 0..5 {
            card = schedule_next_review(&card, ReviewQuality::Again, now()).card;
            assert_eq!(card.ease_factor, 1.3);
            assert_eq!(card.interval, 1);
            assert_eq!(card.repetitions, 0);
        }
    }

    #[test]
    fn test_tampered_state_is_healed() {
        let card = Card {
            interval: 0,
            ease_factor: 0.4,
            ..card_with(5, 3, 2.5)
        };
        for quality in ALL {
            let result = schedule_next_review(&card, quality, now());
            assert!(result.card.ease_factor >= 1.3);
            assert!(result.card.interval >= 1);
        }

        let nan = Card {
            ease_factor: f64::NAN,
            ..card_with(5, 3, 2.5)
        };
        let result = schedule_next_review(&nan, ReviewQuality::Good, now());
        assert!(result.card.ease_factor.is_finite());
        assert_eq!(result.card.interval, 13);
    }

    #[test]
    fn test_no_upper_bound_on_interval() {
        let card = card_with(20_000, 30, 2.5);
        let result = schedule_next_review(&card, ReviewQuality::Easy, now());
        assert_eq!(result.card.interval, 50_000);
    }

    #[test]
    fn test_custom_config() {
        let config = SchedulerConfig {
            second_interval: 4,
            min_ease_factor: 1.5,
            ..SchedulerConfig::default()
        };
        let card = card_with(1, 1, 1.5);
        let result = schedule_next_review_with(&config, &card, ReviewQuality::Again, now());
        assert_eq!(result.card.ease_factor, 1.5);

        let result = schedule_next_review_with(&config, &card, ReviewQuality::Good, now());
        assert_eq!(result.card.interval, 4);
    }

    #[test]
    fn test_identity_fields_untouched() {
        let card = new_card().with_context("animals").with_audio_reference("perro.mp3");
        let result = schedule_next_review(&card, ReviewQuality::Easy, now());
        assert_eq!(result.card.id, card.id);
        assert_eq!(result.card.front, card.front);
        assert_eq!(result.card.context.as_deref(), Some("animals"));
        assert_eq!(result.card.audio_reference.as_deref(), Some("perro.mp3"));
    }

    #[test]
    fn test_batch_update_only_touches_graded_cards() {
        let a = Card::new("a", "uno", "one", now());
        let b = Card::new("b", "dos", "two", now());
        let c = card_with(6, 2, 2.5);
        let cards = vec![a.clone(), b.clone(), c.clone()];

        let responses = vec![
            ReviewResponse::new("a", ReviewQuality::Good),
            ReviewResponse::new(c.id.clone(), ReviewQuality::Again),
            ReviewResponse::new("unknown", ReviewQuality::Easy),
        ];
        let updated = batch_update_cards(&cards, &responses, now());

        assert_eq!(updated.len(), 3);
        assert_eq!(updated[0], schedule_next_review(&a, ReviewQuality::Good, now()).card);
        assert_eq!(updated[1], b);
        assert_eq!(updated[2], schedule_next_review(&c, ReviewQuality::Again, now()).card);
    }

    #[test]
    fn test_batch_update_last_response_wins() {
        let card = card_with(6, 2, 2.5);
        let responses = vec![
            ReviewResponse::new(card.id.clone(), ReviewQuality::Easy),
            ReviewResponse::new(card.id.clone(), ReviewQuality::Again),
        ];
        let updated = batch_update_cards(&[card.clone()], &responses, now());
        assert_eq!(updated[0].repetitions, 0);
        assert_eq!(updated[0].interval, 1);
    }

    #[test]
    fn test_preview_intervals() {
        let card = card_with(10, 3, 2.5);
        assert_eq!(preview_intervals(&card, now()), [1, 25, 25, 25]);
        assert_eq!(preview_intervals(&new_card(), now()), [1, 1, 1, 1]);
    }

    #[test]
    fn test_format_interval_unit_boundaries() {
        let cases = [
            (0, "now"),
            (1, "1d"),
            (6, "6d"),
            (7, "1w"),
            (29, "4w"),
            (30, "1mo"),
            (364, "12mo"),
            (365, "1y"),
            (u32::MAX, "11767033y"),
        ];
        for (days, label) in cases {
            assert_eq!(format_interval(days), label, "{} days", days);
        }
    }

    #[test]
    fn test_format_interval_of_scheduled_steps() {
        let at = |interval: u32, repetitions: u32| Card {
            interval,
            repetitions,
            ..Card::new("c", "la luna", "the moon", now())
        };

        // Second correct review lands on the six-day step
        let second = schedule_next_review(&at(1, 1), ReviewQuality::Good, now());
        assert_eq!(format_interval(second.interval_days), "6d");

        // round(6 * 2.5) = 15
        let third = schedule_next_review(&at(6, 2), ReviewQuality::Good, now());
        assert_eq!(format_interval(third.interval_days), "2w");

        let labels = preview_intervals(&at(40, 4), now()).map(format_interval);
        assert_eq!(labels, ["1d", "3mo", "3mo", "3mo"]);
    }
}
