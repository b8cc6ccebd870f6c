//! Data models for the review engine

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::config::{DEFAULT_INITIAL_EASE_FACTOR, DEFAULT_INITIAL_INTERVAL};

/// A grade the learner gives for one review.
///
/// The numeric values follow the classic SM-2 scale, gap included:
/// - 0: Again, complete failure to recall
/// - 3: Hard, recalled with serious difficulty
/// - 4: Good, recalled with some difficulty
/// - 5: Easy, recalled perfectly
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewQuality {
    Again,
    Hard,
    Good,
    Easy,
}

impl ReviewQuality {
    /// All grades, worst to best
    pub const ALL: [ReviewQuality; 4] = [Self::Again, Self::Hard, Self::Good, Self::Easy];

    /// SM-2 numeric value fed to the ease factor formula
    pub fn value(self) -> i32 {
        match self {
            Self::Again => 0,
            Self::Hard => 3,
            Self::Good => 4,
            Self::Easy => 5,
        }
    }

    /// Whether this grade counts as a correct response
    pub fn is_correct(self) -> bool {
        self >= Self::Hard
    }

    /// Map a 1-4 button rating (Again, Hard, Good, Easy) to a grade
    pub fn from_rating(rating: i32) -> Result<Self, InvalidQuality> {
        match rating {
            1 => Ok(Self::Again),
            2 => Ok(Self::Hard),
            3 => Ok(Self::Good),
            4 => Ok(Self::Easy),
            other => Err(InvalidQuality(other)),
        }
    }
}

impl TryFrom<i32> for ReviewQuality {
    type Error = InvalidQuality;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Again),
            3 => Ok(Self::Hard),
            4 => Ok(Self::Good),
            5 => Ok(Self::Easy),
            other => Err(InvalidQuality(other)),
        }
    }
}

impl fmt::Display for ReviewQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        };
        f.write_str(label)
    }
}

/// A grade value outside the defined set
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid review quality: {0}")]
pub struct InvalidQuality(pub i32);

/// One unit of learnable material together with its schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub front: String,
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_reference: Option<String>,
    /// Days until the next review
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Consecutive correct reviews since the last lapse
    #[serde(default)]
    pub repetitions: u32,
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
    pub due_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<DateTime<Utc>>,
}

fn default_interval() -> u32 {
    DEFAULT_INITIAL_INTERVAL
}

fn default_ease_factor() -> f64 {
    DEFAULT_INITIAL_EASE_FACTOR
}

impl Card {
    /// Create a never-reviewed card that is due immediately
    pub fn new(
        id: impl Into<String>,
        front: impl Into<String>,
        back: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            front: front.into(),
            back: back.into(),
            context: None,
            audio_reference: None,
            interval: DEFAULT_INITIAL_INTERVAL,
            repetitions: 0,
            ease_factor: DEFAULT_INITIAL_EASE_FACTOR,
            due_date: now,
            last_reviewed: None,
        }
    }

    /// Create a card with a freshly generated id, used by bulk imports
    pub fn with_generated_id(
        front: impl Into<String>,
        back: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(Uuid::new_v4().to_string(), front, back, now)
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_audio_reference(mut self, audio_reference: impl Into<String>) -> Self {
        self.audio_reference = Some(audio_reference.into());
        self
    }

    /// Check if the card is due for review
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_date <= now
    }

    /// Where the card currently sits in the learning process
    pub fn status(&self) -> CardStatus {
        match (self.last_reviewed, self.repetitions) {
            (None, _) => CardStatus::New,
            (Some(_), 0) => CardStatus::Relearning,
            (Some(_), 1) => CardStatus::Learning,
            (Some(_), _) => CardStatus::Review,
        }
    }
}

/// Learning status of a card, derived from its schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardStatus {
    /// Never reviewed
    New,
    /// One successful review so far
    Learning,
    /// Regular spaced review
    Review,
    /// Last review was a lapse
    Relearning,
}

/// A learner's grade for one card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub card_id: String,
    pub quality: ReviewQuality,
}

impl ReviewResponse {
    pub fn new(card_id: impl Into<String>, quality: ReviewQuality) -> Self {
        Self {
            card_id: card_id.into(),
            quality,
        }
    }

    /// Build a response from a raw SM-2 grade, rejecting values outside {0, 3, 4, 5}
    pub fn from_raw(card_id: impl Into<String>, quality: i32) -> Result<Self, InvalidQuality> {
        Ok(Self::new(card_id, ReviewQuality::try_from(quality)?))
    }
}

/// Statistics for a card collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub total_cards: usize,
    pub new_cards: usize,
    pub learning_cards: usize,
    pub review_cards: usize,
    pub relearning_cards: usize,
    pub due_cards: usize,
}
