//! Due-set selection over a card collection

use chrono::{DateTime, Utc};

use super::models::{Card, CardStatus, CollectionStats};

/// All cards whose due date has passed
pub fn get_due_cards(cards: &[Card], now: DateTime<Utc>) -> Vec<Card> {
    cards.iter().filter(|c| c.is_due(now)).cloned().collect()
}

/// Cards not yet due, soonest first, optionally capped to `limit`
pub fn get_upcoming_cards(cards: &[Card], now: DateTime<Utc>, limit: Option<usize>) -> Vec<Card> {
    let mut upcoming: Vec<Card> = cards.iter().filter(|c| !c.is_due(now)).cloned().collect();
    upcoming.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    if let Some(limit) = limit {
        upcoming.truncate(limit);
    }
    upcoming
}

/// Count cards by learning status
pub fn collection_stats(cards: &[Card], now: DateTime<Utc>) -> CollectionStats {
    let mut stats = CollectionStats {
        total_cards: cards.len(),
        ..CollectionStats::default()
    };

    for card in cards {
        match card.status() {
            CardStatus::New => stats.new_cards += 1,
            CardStatus::Learning => stats.learning_cards += 1,
            CardStatus::Review => stats.review_cards += 1,
            CardStatus::Relearning => stats.relearning_cards += 1,
        }

        if card.is_due(now) {
            stats.due_cards += 1;
        }
    }

    stats
}
