//! Queue of card writes that could not reach the store yet

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::Card;

/// Cards waiting to be written, at most one entry per card id
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PendingWrites {
    pub items: Vec<PendingWrite>,
}

/// A single queued card write
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWrite {
    /// Latest computed version of the card
    pub card: Card,
    /// When this item was queued
    pub queued_at: DateTime<Utc>,
    /// Number of failed write attempts
    pub retries: u32,
    /// Last error message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Queue a card, replacing any older queued version of it
    pub fn enqueue(&mut self, card: Card, error: String, now: DateTime<Utc>) {
        if let Some(item) = self.items.iter_mut().find(|i| i.card.id == card.id) {
            item.card = card;
            item.retries += 1;
            item.last_error = Some(error);
            return;
        }

        self.items.push(PendingWrite {
            card,
            queued_at: now,
            retries: 1,
            last_error: Some(error),
        });
    }

    /// Drop a card from the queue once it is written
    pub fn complete(&mut self, card_id: &str) {
        self.items.retain(|item| item.card.id != card_id);
    }

    /// Record another failed attempt for every queued card
    pub fn fail_all(&mut self, error: &str) {
        for item in &mut self.items {
            item.retries += 1;
            item.last_error = Some(error.to_string());
        }
    }

    pub fn get(&self, card_id: &str) -> Option<&Card> {
        self.items
            .iter()
            .find(|item| item.card.id == card_id)
            .map(|item| &item.card)
    }

    pub fn cards(&self) -> Vec<Card> {
        self.items.iter().map(|item| item.card.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Load queue from file
    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save queue to file
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_queue_deduplication() {
        let mut queue = PendingWrites::new();
        let mut card = Card::new("c1", "el agua", "the water", now());

        queue.enqueue(card.clone(), "offline".to_string(), now());
        card.interval = 6;
        queue.enqueue(card, "still offline".to_string(), now());

        // Should only have one item, holding the newest card
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get("c1").unwrap().interval, 6);
        assert_eq!(queue.items[0].retries, 2);
        assert_eq!(queue.items[0].last_error.as_deref(), Some("still offline"));
    }

    #[test]
    fn test_queue_different_cards() {
        let mut queue = PendingWrites::new();
        queue.enqueue(Card::new("c1", "a", "b", now()), "offline".to_string(), now());
        queue.enqueue(Card::new("c2", "c", "d", now()), "offline".to_string(), now());
        assert_eq!(queue.len(), 2);

        queue.complete("c1");
        assert_eq!(queue.len(), 1);
        assert!(queue.get("c1").is_none());

        queue.fail_all("timeout");
        assert_eq!(queue.items[0].retries, 2);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state").join("pending.json");

        assert!(PendingWrites::load(&path).unwrap().is_empty());

        let mut queue = PendingWrites::new();
        queue.enqueue(Card::new("c1", "a", "b", now()), "offline".to_string(), now());
        queue.save(&path).unwrap();

        let loaded = PendingWrites::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.cards(), queue.cards());
    }
}
