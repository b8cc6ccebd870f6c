//! Card storage
//!
//! `CardStore` is the boundary to whatever durable backend the host uses.
//! Writes are keyed by card id, so writing the same card twice is harmless.
//!
//! `FileCardStore` directory structure:
//! ```text
//! {base}/{user-id}/
//! └── cards/
//!     └── {card-id}.json   # Individual card files
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

use super::models::Card;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Card not found: {0}")]
    CardNotFound(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable mapping from card id to card, partitioned by user
pub trait CardStore {
    /// All cards belonging to a user
    fn get_all_for_user(&self, user_id: &str) -> Result<Vec<Card>>;

    /// A single card, `None` if it does not exist
    fn get(&self, user_id: &str, card_id: &str) -> Result<Option<Card>>;

    /// Insert or replace a card
    fn put(&self, user_id: &str, card: &Card) -> Result<()>;

    /// Insert or replace several cards
    fn put_batch(&self, user_id: &str, cards: &[Card]) -> Result<()> {
        for card in cards {
            self.put(user_id, card)?;
        }
        Ok(())
    }
}

impl<S: CardStore + ?Sized> CardStore for &S {
    fn get_all_for_user(&self, user_id: &str) -> Result<Vec<Card>> {
        (**self).get_all_for_user(user_id)
    }

    fn get(&self, user_id: &str, card_id: &str) -> Result<Option<Card>> {
        (**self).get(user_id, card_id)
    }

    fn put(&self, user_id: &str, card: &Card) -> Result<()> {
        (**self).put(user_id, card)
    }

    fn put_batch(&self, user_id: &str, cards: &[Card]) -> Result<()> {
        (**self).put_batch(user_id, cards)
    }
}

/// Ids become path components, so only a safe character set is accepted
fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

/// Card store backed by one JSON file per card
pub struct FileCardStore {
    /// Base path for user directories
    base_path: PathBuf,
}

impl FileCardStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the cards directory for a user
    fn cards_dir(&self, user_id: &str) -> PathBuf {
        self.base_path.join(user_id).join("cards")
    }

    /// Get the path for a specific card
    fn card_path(&self, user_id: &str, card_id: &str) -> PathBuf {
        self.cards_dir(user_id).join(format!("{}.json", card_id))
    }

    /// Remove a card
    pub fn delete(&self, user_id: &str, card_id: &str) -> Result<()> {
        validate_id(user_id)?;
        validate_id(card_id)?;

        let card_path = self.card_path(user_id, card_id);
        if !card_path.exists() {
            return Err(StoreError::CardNotFound(card_id.to_string()));
        }
        fs::remove_file(&card_path)?;
        Ok(())
    }
}

impl CardStore for FileCardStore {
    fn get_all_for_user(&self, user_id: &str) -> Result<Vec<Card>> {
        validate_id(user_id)?;

        let cards_dir = self.cards_dir(user_id);
        if !cards_dir.exists() {
            return Ok(Vec::new());
        }

        let mut cards = Vec::new();
        for entry in fs::read_dir(&cards_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                let content = fs::read_to_string(&path)?;
                let card: Card = serde_json::from_str(&content)?;
                cards.push(card);
            }
        }

        cards.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(cards)
    }

    fn get(&self, user_id: &str, card_id: &str) -> Result<Option<Card>> {
        validate_id(user_id)?;
        validate_id(card_id)?;

        let card_path = self.card_path(user_id, card_id);
        if !card_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&card_path)?;
        let card: Card = serde_json::from_str(&content)?;
        Ok(Some(card))
    }

    fn put(&self, user_id: &str, card: &Card) -> Result<()> {
        validate_id(user_id)?;
        validate_id(&card.id)?;

        fs::create_dir_all(self.cards_dir(user_id))?;

        // Temp file + rename keeps each card file whole
        let card_path = self.card_path(user_id, &card.id);
        let tmp_path = card_path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(card)?)?;
        fs::rename(&tmp_path, &card_path)?;
        Ok(())
    }

    fn put_batch(&self, user_id: &str, cards: &[Card]) -> Result<()> {
        // Validate everything before touching disk
        validate_id(user_id)?;
        for card in cards {
            validate_id(&card.id)?;
        }
        for card in cards {
            self.put(user_id, card)?;
        }
        Ok(())
    }
}

/// Any id is a valid map key, but a card without one cannot be looked up
fn require_card_id(card: &Card) -> Result<()> {
    if card.id.is_empty() {
        return Err(StoreError::InvalidId(String::new()));
    }
    Ok(())
}

/// Card store held in memory
#[derive(Debug, Default)]
pub struct MemoryCardStore {
    users: Mutex<HashMap<String, HashMap<String, Card>>>,
}

impl MemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_users<T>(&self, f: impl FnOnce(&mut HashMap<String, HashMap<String, Card>>) -> T) -> T {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut users)
    }
}

impl CardStore for MemoryCardStore {
    fn get_all_for_user(&self, user_id: &str) -> Result<Vec<Card>> {
        Ok(self.with_users(|users| {
            let mut cards: Vec<Card> = users
                .get(user_id)
                .map(|cards| cards.values().cloned().collect())
                .unwrap_or_default();
            cards.sort_by(|a, b| a.id.cmp(&b.id));
            cards
        }))
    }

    fn get(&self, user_id: &str, card_id: &str) -> Result<Option<Card>> {
        Ok(self.with_users(|users| {
            users
                .get(user_id)
                .and_then(|cards| cards.get(card_id))
                .cloned()
        }))
    }

    fn put(&self, user_id: &str, card: &Card) -> Result<()> {
        require_card_id(card)?;
        self.with_users(|users| {
            users
                .entry(user_id.to_string())
                .or_default()
                .insert(card.id.clone(), card.clone());
        });
        Ok(())
    }

    fn put_batch(&self, user_id: &str, cards: &[Card]) -> Result<()> {
        for card in cards {
            require_card_id(card)?;
        }
        self.with_users(|users| {
            let user_cards = users.entry(user_id.to_string()).or_default();
            for card in cards {
                user_cards.insert(card.id.clone(), card.clone());
            }
        });
        Ok(())
    }
}
