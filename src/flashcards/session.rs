//! Review sessions
//!
//! A session is built from the cards that are due, capped and shuffled once.
//! The caller presents the cards and collects grades; completing the session
//! schedules every graded card and reports aggregate statistics. Sessions are
//! never persisted, only the cards they produce are.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::algorithm::{latest_grades, schedule_next_review_with};
use super::config::SchedulerConfig;
use super::due::get_due_cards;
use super::models::{Card, ReviewResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    /// Cards selected, waiting for responses
    Ready,
    /// Nothing was due; the session is already over
    Empty,
    /// Responses applied
    Completed,
}

/// Cards selected for one sitting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSession {
    pub cards: Vec<Card>,
    pub session_start: DateTime<Utc>,
    pub status: SessionStatus,
    /// Filled in on completion
    pub cards_reviewed: usize,
    /// Filled in on completion
    pub accuracy: f64,
}

impl ReviewSession {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, SessionStatus::Empty | SessionStatus::Completed)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn card(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }
}

/// Aggregates for a completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub cards_reviewed: usize,
    /// Share of correct responses, 0.0-1.0
    pub accuracy: f64,
    /// Mean SM-2 grade of the responses
    pub average_quality: f64,
    pub duration_seconds: i64,
}

/// What a completed session produced
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session: ReviewSession,
    pub updated_cards: Vec<Card>,
    pub stats: SessionStats,
    /// Response card ids that matched no card in the session
    pub ignored: Vec<String>,
}

/// Build a session from the due cards in a collection
///
/// The most overdue cards are kept when more than `max_cards` are due; the
/// kept cards are then shuffled once with `rng`.
pub fn start_session<R: Rng + ?Sized>(
    all_cards: &[Card],
    max_cards: usize,
    now: DateTime<Utc>,
    rng: &mut R,
) -> ReviewSession {
    let mut cards = get_due_cards(all_cards, now);
    cards.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    cards.truncate(max_cards);
    cards.shuffle(rng);

    let status = if cards.is_empty() {
        SessionStatus::Empty
    } else {
        SessionStatus::Ready
    };

    log::info!(
        "Started review session with {} of {} cards",
        cards.len(),
        all_cards.len()
    );

    ReviewSession {
        cards,
        session_start: now,
        status,
        cards_reviewed: 0,
        accuracy: 0.0,
    }
}

pub fn complete_session(
    session: ReviewSession,
    responses: &[ReviewResponse],
    now: DateTime<Utc>,
) -> SessionOutcome {
    complete_session_with(&SchedulerConfig::default(), session, responses, now)
}

/// Apply responses to the session's cards
///
/// Only the last response per card id updates a card. Responses for cards
/// that are not in the session are skipped and listed in the outcome.
/// Statistics count every response for a card in the session, repeats
/// included. A session that is already over is returned untouched.
pub fn complete_session_with(
    config: &SchedulerConfig,
    mut session: ReviewSession,
    responses: &[ReviewResponse],
    now: DateTime<Utc>,
) -> SessionOutcome {
    let known: HashSet<&str> = session.cards.iter().map(|c| c.id.as_str()).collect();
    let (valid, unknown): (Vec<&ReviewResponse>, Vec<&ReviewResponse>) = responses
        .iter()
        .partition(|r| known.contains(r.card_id.as_str()));

    let mut ignored: Vec<String> = unknown.iter().map(|r| r.card_id.clone()).collect();
    ignored.sort();
    ignored.dedup();
    for id in &ignored {
        log::warn!("Ignoring response for unknown card {}", id);
    }

    let duration_seconds = (now - session.session_start).num_seconds();

    if session.is_terminal() {
        log::warn!(
            "Session started at {} is already over, ignoring {} responses",
            session.session_start,
            responses.len()
        );
        let stats = SessionStats {
            cards_reviewed: 0,
            accuracy: 0.0,
            average_quality: 0.0,
            duration_seconds,
        };
        return SessionOutcome {
            session,
            updated_cards: Vec::new(),
            stats,
            ignored,
        };
    }

    let grades = latest_grades(responses);
    let mut updated_cards = Vec::new();
    let mut seen = HashSet::new();
    for card in &session.cards {
        if !seen.insert(card.id.as_str()) {
            continue;
        }
        if let Some(&quality) = grades.get(card.id.as_str()) {
            updated_cards.push(schedule_next_review_with(config, card, quality, now).card);
        }
    }

    let cards_reviewed = valid.len();
    let (accuracy, average_quality) = if cards_reviewed == 0 {
        (0.0, 0.0)
    } else {
        let n = cards_reviewed as f64;
        let correct = valid.iter().filter(|r| r.quality.is_correct()).count();
        let quality_sum: i64 = valid.iter().map(|r| i64::from(r.quality.value())).sum();
        (correct as f64 / n, quality_sum as f64 / n)
    };

    let stats = SessionStats {
        cards_reviewed,
        accuracy,
        average_quality,
        duration_seconds,
    };

    session.cards_reviewed = cards_reviewed;
    session.accuracy = accuracy;
    session.status = SessionStatus::Completed;

    log::info!(
        "Completed review session: {} responses, {} cards updated, accuracy {:.0}%, {} ignored",
        cards_reviewed,
        updated_cards.len(),
        accuracy * 100.0,
        ignored.len()
    );

    SessionOutcome {
        session,
        updated_cards,
        stats,
        ignored,
    }
}
