//! Flashcard scheduling engine
//!
//! This module provides:
//! - SM-2 spaced repetition scheduling
//! - Memory strength estimation
//! - Due-set selection
//! - Review sessions, with store writes that survive store outages

pub mod algorithm;
pub mod clock;
pub mod config;
pub mod due;
pub mod memory;
pub mod models;
pub mod orchestrator;
pub mod queue;
pub mod session;
pub mod storage;

pub use algorithm::{
    batch_update_cards, batch_update_cards_with, format_interval, preview_intervals,
    preview_intervals_with, schedule_next_review, schedule_next_review_with, ScheduledReview,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, SchedulerConfig};
pub use due::{collection_stats, get_due_cards, get_upcoming_cards};
pub use memory::{
    calculate_memory_strength, confidence, get_optimal_review_time, get_optimal_review_time_with,
    memory_strength, memory_strength_with, MemoryStrength,
};
pub use models::*;
pub use orchestrator::{BatchUpdateReport, CompletionReport, PersistReport, SessionOrchestrator};
pub use queue::{PendingWrite, PendingWrites};
pub use session::{
    complete_session, complete_session_with, start_session, ReviewSession, SessionOutcome,
    SessionStats, SessionStatus,
};
pub use storage::{CardStore, FileCardStore, MemoryCardStore, StoreError};
