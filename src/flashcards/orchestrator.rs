//! Session orchestration against a card store
//!
//! Owned by one user's caller for the lifetime of their reviews. Scheduling
//! always runs first; writing to the store happens afterwards. Cards the
//! store could not take stay queued in memory until `retry_pending` gets
//! them through, except ids the store will never accept, which are rejected.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::algorithm::{latest_grades, schedule_next_review_with};
use super::clock::Clock;
use super::config::SchedulerConfig;
use super::models::{Card, ReviewResponse};
use super::queue::PendingWrites;
use super::session::{self, ReviewSession, SessionOutcome};
use super::storage::{CardStore, StoreError};

/// What happened when cards were written to the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistReport {
    /// Ids written successfully
    pub persisted: Vec<String>,
    /// Ids kept in the pending queue
    pub queued: Vec<String>,
    /// Ids the store will never accept; these are not queued
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PersistReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.queued.is_empty() && self.rejected.is_empty()
    }
}

/// Per-card result of one write attempt
#[derive(Default)]
struct WriteAttempt {
    persisted: Vec<String>,
    rejected: Vec<String>,
    failed: Vec<(Card, String)>,
}

/// Result of completing a session through the orchestrator
#[derive(Debug, Clone)]
pub struct CompletionReport {
    pub outcome: SessionOutcome,
    pub persist: PersistReport,
}

/// Result of a bulk update outside a session
#[derive(Debug, Clone)]
pub struct BatchUpdateReport {
    pub updated_cards: Vec<Card>,
    /// Response card ids that matched no card
    pub ignored: Vec<String>,
    pub persist: PersistReport,
}

pub struct SessionOrchestrator<S, C> {
    store: S,
    clock: C,
    config: SchedulerConfig,
    user_id: String,
    /// Last known version of each card
    cache: HashMap<String, Card>,
    pending: PendingWrites,
}

impl<S: CardStore, C: Clock> SessionOrchestrator<S, C> {
    pub fn new(store: S, clock: C, user_id: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            config: SchedulerConfig::default(),
            user_id: user_id.into(),
            cache: HashMap::new(),
            pending: PendingWrites::new(),
        }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Resume with writes left over from an earlier run
    pub fn with_pending(mut self, pending: PendingWrites) -> Self {
        for card in pending.cards() {
            self.cache.insert(card.id.clone(), card);
        }
        self.pending = pending;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn pending(&self) -> &PendingWrites {
        &self.pending
    }

    /// Cards computed but not yet written to the store
    pub fn pending_cards(&self) -> Vec<Card> {
        self.pending.cards()
    }

    /// The user's cards, with queued writes taking precedence over the store
    ///
    /// When the store cannot be read, the cards seen so far are used instead;
    /// with nothing cached the store error is returned.
    pub fn load_cards(&mut self) -> Result<Vec<Card>, StoreError> {
        match self.store.get_all_for_user(&self.user_id) {
            Ok(cards) => {
                self.cache = cards.into_iter().map(|c| (c.id.clone(), c)).collect();
            }
            Err(e) if !self.cache.is_empty() => {
                log::warn!(
                    "Card store unavailable for user {}, using {} cached cards: {}",
                    self.user_id,
                    self.cache.len(),
                    e
                );
            }
            Err(e) => {
                log::error!("Failed to load cards for user {}: {}", self.user_id, e);
                return Err(e);
            }
        }

        for card in self.pending.cards() {
            self.cache.insert(card.id.clone(), card);
        }

        let mut cards: Vec<Card> = self.cache.values().cloned().collect();
        cards.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(cards)
    }

    /// Start a session over the user's due cards
    ///
    /// `max_cards` falls back to the configured session size.
    pub fn start_session<R: Rng + ?Sized>(
        &mut self,
        max_cards: Option<usize>,
        rng: &mut R,
    ) -> Result<ReviewSession, StoreError> {
        let cards = self.load_cards()?;
        let max_cards = max_cards.unwrap_or(self.config.session_size);
        Ok(session::start_session(&cards, max_cards, self.clock.now(), rng))
    }

    /// Schedule every graded card, then write the results to the store
    pub fn complete_session(
        &mut self,
        session: ReviewSession,
        responses: &[ReviewResponse],
    ) -> CompletionReport {
        let outcome =
            session::complete_session_with(&self.config, session, responses, self.clock.now());
        let persist = self.persist(outcome.updated_cards.clone());
        CompletionReport { outcome, persist }
    }

    /// Apply grades to the user's cards without a session
    pub fn batch_update(
        &mut self,
        responses: &[ReviewResponse],
    ) -> Result<BatchUpdateReport, StoreError> {
        let cards = self.load_cards()?;
        let now = self.clock.now();
        let grades = latest_grades(responses);

        let by_id: HashMap<&str, &Card> = cards.iter().map(|c| (c.id.as_str(), c)).collect();
        let mut ignored: Vec<String> = grades
            .keys()
            .filter(|id| !by_id.contains_key(**id))
            .map(|id| id.to_string())
            .collect();
        ignored.sort();

        let updated_cards: Vec<Card> = cards
            .iter()
            .filter_map(|card| {
                grades.get(card.id.as_str()).map(|&quality| {
                    schedule_next_review_with(&self.config, card, quality, now).card
                })
            })
            .collect();

        let persist = self.persist(updated_cards.clone());
        Ok(BatchUpdateReport {
            updated_cards,
            ignored,
            persist,
        })
    }

    /// Create a new card due now and store it
    ///
    /// Fails with [`StoreError::InvalidId`] when the store cannot hold a card
    /// under `id`. Other store errors leave the card queued.
    pub fn create_card(
        &mut self,
        id: impl Into<String>,
        front: impl Into<String>,
        back: impl Into<String>,
        context: Option<String>,
        audio_reference: Option<String>,
    ) -> Result<(Card, PersistReport), StoreError> {
        let mut card = Card::new(id, front, back, self.clock.now());
        card.context = context;
        card.audio_reference = audio_reference;

        let report = self.persist(vec![card.clone()]);
        if !report.rejected.is_empty() {
            return Err(StoreError::InvalidId(card.id));
        }
        Ok((card, report))
    }

    /// Store a batch of cards as they are, e.g. from a vocabulary import
    pub fn import_cards(&mut self, cards: Vec<Card>) -> PersistReport {
        log::info!("Importing {} cards for user {}", cards.len(), self.user_id);
        self.persist(cards)
    }

    /// Try to write every queued card again
    pub fn retry_pending(&mut self) -> PersistReport {
        if self.pending.is_empty() {
            return PersistReport::default();
        }

        let cards = self.pending.cards();
        let attempt = self.write(&cards);
        for id in attempt.persisted.iter().chain(&attempt.rejected) {
            self.pending.complete(id);
        }
        for id in &attempt.rejected {
            self.cache.remove(id);
        }

        let now = self.clock.now();
        let mut queued = Vec::new();
        let mut error = None;
        for (card, e) in attempt.failed {
            queued.push(card.id.clone());
            self.pending.enqueue(card, e.clone(), now);
            error = Some(e);
        }

        if queued.is_empty() {
            log::info!("Flushed {} pending card writes", attempt.persisted.len());
        } else {
            log::warn!(
                "Retry left {} of {} pending card writes queued",
                queued.len(),
                cards.len()
            );
        }

        PersistReport {
            error: error.or_else(|| rejected_error(&attempt.rejected)),
            persisted: attempt.persisted,
            queued,
            rejected: attempt.rejected,
        }
    }

    fn persist(&mut self, cards: Vec<Card>) -> PersistReport {
        if cards.is_empty() {
            return PersistReport::default();
        }

        let attempt = self.write(&cards);
        for card in cards {
            if !attempt.rejected.contains(&card.id) {
                self.cache.insert(card.id.clone(), card);
            }
        }
        for id in attempt.persisted.iter().chain(&attempt.rejected) {
            self.pending.complete(id);
        }

        let now = self.clock.now();
        let mut queued = Vec::new();
        let mut error = None;
        for (card, e) in attempt.failed {
            queued.push(card.id.clone());
            self.pending.enqueue(card, e.clone(), now);
            error = Some(e);
        }

        if let Some(e) = &error {
            log::warn!(
                "Could not write {} cards for user {}, keeping them queued: {}",
                queued.len(),
                self.user_id,
                e
            );
        }

        PersistReport {
            error: error.or_else(|| rejected_error(&attempt.rejected)),
            persisted: attempt.persisted,
            queued,
            rejected: attempt.rejected,
        }
    }

    /// Write the whole batch, falling back to one card at a time if it fails
    fn write(&self, cards: &[Card]) -> WriteAttempt {
        let mut attempt = WriteAttempt::default();
        match self.store.put_batch(&self.user_id, cards) {
            Ok(()) => {
                attempt.persisted = cards.iter().map(|c| c.id.clone()).collect();
                return attempt;
            }
            Err(e) => {
                log::debug!("Batch write of {} cards failed, writing singly: {}", cards.len(), e);
            }
        }

        for card in cards {
            match self.store.put(&self.user_id, card) {
                Ok(()) => attempt.persisted.push(card.id.clone()),
                Err(StoreError::InvalidId(id)) => {
                    log::error!(
                        "Rejecting card {} for user {}: invalid id {}",
                        card.id,
                        self.user_id,
                        id
                    );
                    attempt.rejected.push(card.id.clone());
                }
                Err(e) => attempt.failed.push((card.clone(), e.to_string())),
            }
        }
        attempt
    }
}

fn rejected_error(rejected: &[String]) -> Option<String> {
    if rejected.is_empty() {
        None
    } else {
        Some(format!("Rejected invalid card ids: {}", rejected.join(", ")))
    }
}
