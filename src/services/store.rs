use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use crate::core::error::{Result, StoreError};
use crate::core::idea::{BookIdea, GeneratorOptions};
use crate::core::io::Storage;
use crate::utils::text::query_terms;

pub const FAVORITES_KEY: &str = "bookspark_favorites";
pub const HISTORY_KEY: &str = "bookspark_history";
pub const SETTINGS_KEY: &str = "bookspark_settings";
const PROBE_KEY: &str = "__bookspark_probe__";

pub const MAX_FAVORITES: usize = 100;
pub const MAX_HISTORY: usize = 50;
pub const FORMAT_VERSION: &str = "1.0";

const LAST_OPTIONS_SETTING: &str = "lastOptions";

const REQUIRED_FIELDS: [&str; 10] = [
    "id",
    "title",
    "genre",
    "concept",
    "mainCharacter",
    "setting",
    "conflict",
    "targetAudience",
    "openingLine",
    "themes",
];

pub type Settings = serde_json::Map<String, Value>;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub export_date: DateTime<Utc>,
    pub version: String,
    pub total_ideas: usize,
    pub ideas: Vec<BookIdea>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackupDocument {
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub favorites: Vec<BookIdea>,
    pub history: Vec<BookIdea>,
    pub settings: Settings,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub success: bool,
    pub imported: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct RestoreReport {
    pub success: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub favorites: usize,
    pub history: usize,
    pub max_favorites: usize,
    pub max_history: usize,
    /// Sum of the serialized sizes of the three collections, in bytes.
    pub storage_used: usize,
    pub storage_available: bool,
}

/// Favorites, history and settings persisted in a key-value `Storage`.
///
/// Every operation reads the whole collection, changes it in memory and
/// writes it back. Single-item writes return a typed `StoreError`; bulk
/// operations report problems in their result; reads degrade to empty
/// values and log the cause.
pub struct IdeaStore {
    storage: Arc<dyn Storage>,
}

impl IdeaStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Probes the medium with a throwaway write and delete.
    pub async fn is_available(&self) -> bool {
        if let Err(e) = self.storage.write(PROBE_KEY, PROBE_KEY.as_bytes()).await {
            log::debug!("Storage probe write failed: {:#}", e);
            return false;
        }
        if let Err(e) = self.storage.delete(PROBE_KEY).await {
            log::debug!("Storage probe delete failed: {:#}", e);
            return false;
        }
        true
    }

    async fn ensure_available(&self) -> Result<()> {
        if self.is_available().await {
            Ok(())
        } else {
            Err(StoreError::Storage("Local storage is not available".to_string()))
        }
    }

    async fn load_ideas(&self, key: &str) -> Result<Vec<BookIdea>> {
        self.ensure_available().await?;
        let bytes = match self.storage.read(key).await.map_err(StoreError::storage)? {
            Some(bytes) => bytes,
            None => return Ok(Vec::new()),
        };

        let items = match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                log::warn!("{} does not hold a list, ignoring it", key);
                return Ok(Vec::new());
            }
            Err(e) => {
                log::warn!("{} is corrupted, ignoring it: {}", key, e);
                return Ok(Vec::new());
            }
        };

        let mut ideas = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<BookIdea>(item) {
                Ok(idea) => ideas.push(idea),
                Err(e) => log::warn!("Skipping unreadable entry in {}: {}", key, e),
            }
        }
        Ok(ideas)
    }

    async fn store_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.ensure_available().await?;
        let content = serde_json::to_vec(value)?;
        self.storage
            .write(key, &content)
            .await
            .map_err(StoreError::storage)
    }

    async fn remove_key(&self, key: &str) -> Result<()> {
        self.ensure_available().await?;
        self.storage.delete(key).await.map_err(StoreError::storage)
    }

    fn degrade<T: Default>(what: &str, result: Result<T>) -> T {
        result.unwrap_or_else(|e| {
            log::warn!("Failed to retrieve {}: {}", what, e);
            T::default()
        })
    }

    // --- Favorites ---

    /// Puts `idea` at the front of favorites and records it in history.
    pub async fn save_favorite(&self, idea: &BookIdea) -> Result<()> {
        let mut favorites = self.load_ideas(FAVORITES_KEY).await?;

        if favorites.iter().any(|fav| fav.id == idea.id) {
            return Err(StoreError::Duplicate(idea.id.clone()));
        }
        if favorites.len() >= MAX_FAVORITES {
            return Err(StoreError::Capacity { max: MAX_FAVORITES });
        }

        favorites.insert(0, idea.clone());
        self.store_json(FAVORITES_KEY, &favorites).await?;
        log::debug!("Saved favorite {} ({} total)", idea.id, favorites.len());

        self.add_to_history(idea).await;
        Ok(())
    }

    /// Most recently saved first.
    pub async fn get_favorites(&self) -> Vec<BookIdea> {
        Self::degrade("favorite ideas", self.load_ideas(FAVORITES_KEY).await)
    }

    pub async fn remove_favorite(&self, id: &str) -> Result<()> {
        let mut favorites = self.load_ideas(FAVORITES_KEY).await?;
        let before = favorites.len();
        favorites.retain(|idea| idea.id != id);

        if favorites.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.store_json(FAVORITES_KEY, &favorites).await
    }

    pub async fn clear_favorites(&self) -> Result<()> {
        self.remove_key(FAVORITES_KEY).await
    }

    pub async fn is_idea_saved(&self, id: &str) -> bool {
        self.get_favorites().await.iter().any(|idea| idea.id == id)
    }

    pub async fn export_favorites(&self) -> String {
        let ideas = self.get_favorites().await;
        let document = ExportDocument {
            export_date: Utc::now(),
            version: FORMAT_VERSION.to_string(),
            total_ideas: ideas.len(),
            ideas,
        };

        serde_json::to_string_pretty(&document).unwrap_or_else(|e| {
            log::error!("Failed to export favorite ideas: {}", e);
            serde_json::json!({ "error": "Export failed", "ideas": [] }).to_string()
        })
    }

    /// Adds the valid, not yet saved ideas of an export document in front of
    /// the existing favorites. Problems are reported per item.
    pub async fn import_favorites(&self, json: &str) -> ImportReport {
        let mut report = ImportReport::default();

        let document: Value = match serde_json::from_str(json) {
            Ok(value) => value,
            Err(e) => {
                report.errors.push(format!("Parse error: {}", e));
                return report;
            }
        };
        let Some(items) = document.get("ideas").and_then(Value::as_array) else {
            report
                .errors
                .push("Invalid import format: missing or invalid ideas array".to_string());
            return report;
        };

        let existing = match self.load_ideas(FAVORITES_KEY).await {
            Ok(existing) => existing,
            Err(e) => {
                report.errors.push(e.to_string());
                return report;
            }
        };
        let mut known_ids: HashSet<String> = existing.iter().map(|idea| idea.id.clone()).collect();
        let mut accepted: Vec<BookIdea> = Vec::new();

        for (i, item) in items.iter().enumerate() {
            let idea = match validate_idea(item) {
                Ok(idea) => idea,
                Err(e) => {
                    report.errors.push(format!("Idea {}: {}", i + 1, e));
                    continue;
                }
            };
            if known_ids.contains(&idea.id) {
                report
                    .errors
                    .push(format!("Idea {}: Already exists in favorites", i + 1));
                continue;
            }
            if existing.len() + accepted.len() >= MAX_FAVORITES {
                report
                    .errors
                    .push(format!("Reached maximum favorites limit ({})", MAX_FAVORITES));
                continue;
            }
            known_ids.insert(idea.id.clone());
            accepted.push(idea);
        }

        if !accepted.is_empty() {
            let imported = accepted.len();
            accepted.extend(existing);
            match self.store_json(FAVORITES_KEY, &accepted).await {
                Ok(()) => {
                    report.success = true;
                    report.imported = imported;
                }
                Err(e) => report.errors.push(format!("Save failed: {}", e)),
            }
        }

        log::info!(
            "Imported {} ideas ({} problems)",
            report.imported,
            report.errors.len()
        );
        report
    }

    // --- History ---

    /// Moves or inserts `idea` at the front of history, evicting the oldest
    /// entries beyond capacity. Failures are logged, not returned.
    pub async fn add_to_history(&self, idea: &BookIdea) {
        if let Err(e) = self.try_add_to_history(idea).await {
            log::warn!("Failed to add idea to history: {}", e);
        }
    }

    async fn try_add_to_history(&self, idea: &BookIdea) -> Result<()> {
        let mut history = self.load_ideas(HISTORY_KEY).await?;
        history.retain(|h| h.id != idea.id);
        history.insert(0, idea.clone());
        history.truncate(MAX_HISTORY);
        self.store_json(HISTORY_KEY, &history).await
    }

    /// Most recent first.
    pub async fn get_history(&self) -> Vec<BookIdea> {
        Self::degrade("history", self.load_ideas(HISTORY_KEY).await)
    }

    pub async fn clear_history(&self) -> Result<()> {
        self.remove_key(HISTORY_KEY).await
    }

    // --- Settings ---

    async fn load_settings(&self) -> Result<Settings> {
        self.ensure_available().await?;
        let Some(bytes) = self.storage.read(SETTINGS_KEY).await.map_err(StoreError::storage)? else {
            return Ok(Settings::new());
        };
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Settings::new()),
        }
    }

    pub async fn get_settings(&self) -> Settings {
        Self::degrade("settings", self.load_settings().await)
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.store_json(SETTINGS_KEY, settings).await
    }

    /// Options of the most recent generation, if remembered.
    pub async fn last_options(&self) -> Option<GeneratorOptions> {
        let settings = self.get_settings().await;
        let value = settings.get(LAST_OPTIONS_SETTING)?.clone();
        serde_json::from_value(value).ok()
    }

    pub async fn remember_options(&self, options: &GeneratorOptions) -> Result<()> {
        let mut settings = self.load_settings().await.unwrap_or_default();
        settings.insert(LAST_OPTIONS_SETTING.to_string(), serde_json::to_value(options)?);
        self.save_settings(&settings).await
    }

    // --- Queries ---

    /// Ideas whose searchable text contains any of the query's terms,
    /// ignoring case. History entries already in favorites are not repeated.
    pub async fn search_ideas(&self, query: &str, include_history: bool) -> Vec<BookIdea> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut ideas = self.get_favorites().await;
        if include_history {
            ideas.extend(self.get_history().await);
            let mut seen = HashSet::new();
            ideas.retain(|idea| seen.insert(idea.id.clone()));
        }

        ideas
            .into_iter()
            .filter(|idea| {
                let text = idea.searchable_text();
                terms.iter().any(|term| text.contains(term.as_str()))
            })
            .collect()
    }

    pub async fn get_ideas_by_genre(&self, genre: &str) -> Vec<BookIdea> {
        let genre = genre.to_lowercase();
        self.get_favorites()
            .await
            .into_iter()
            .filter(|idea| idea.genre.to_lowercase() == genre)
            .collect()
    }

    pub async fn get_ideas_by_audience(&self, audience: &str) -> Vec<BookIdea> {
        self.get_favorites()
            .await
            .into_iter()
            .filter(|idea| idea.target_audience.as_str().eq_ignore_ascii_case(audience))
            .collect()
    }

    // --- Backup ---

    pub async fn create_backup(&self) -> String {
        let document = BackupDocument {
            timestamp: Utc::now(),
            version: FORMAT_VERSION.to_string(),
            favorites: self.get_favorites().await,
            history: self.get_history().await,
            settings: self.get_settings().await,
        };

        serde_json::to_string_pretty(&document).unwrap_or_else(|e| {
            log::error!("Failed to create backup: {}", e);
            serde_json::json!({ "error": "Backup failed" }).to_string()
        })
    }

    /// Replaces favorites with the backup's, and history and settings when
    /// the backup carries them with the right shape. Malformed ideas are
    /// skipped individually.
    pub async fn restore_from_backup(&self, json: &str) -> RestoreReport {
        let mut report = RestoreReport::default();

        let document: Value = match serde_json::from_str(json) {
            Ok(value) => value,
            Err(e) => {
                report.errors.push(format!("Restore failed: {}", e));
                return report;
            }
        };
        let Some(favorites) = document.get("favorites").and_then(Value::as_array) else {
            report
                .errors
                .push("Invalid backup: missing favorites data".to_string());
            return report;
        };
        if let Err(e) = self.ensure_available().await {
            report.errors.push(format!("Restore failed: {}", e));
            return report;
        }

        let favorites = collect_valid("Favorite", favorites, MAX_FAVORITES, &mut report.errors);
        let mut writes = vec![(FAVORITES_KEY, serde_json::to_value(&favorites))];

        match document.get("history") {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                let history = collect_valid("History entry", items, MAX_HISTORY, &mut report.errors);
                writes.push((HISTORY_KEY, serde_json::to_value(&history)));
            }
            Some(_) => report
                .errors
                .push("Invalid backup: history is not a list, keeping current history".to_string()),
        }

        match document.get("settings") {
            None | Some(Value::Null) => {}
            Some(settings @ Value::Object(_)) => writes.push((SETTINGS_KEY, Ok(settings.clone()))),
            Some(_) => report
                .errors
                .push("Invalid backup: settings is not an object, keeping current settings".to_string()),
        }

        let mut all_written = true;
        for (key, value) in writes {
            let result = match value {
                Ok(value) => self.store_json(key, &value).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                report.errors.push(format!("Restore failed for {}: {}", key, e));
                all_written = false;
            }
        }

        report.success = all_written;
        log::info!(
            "Restored backup: {} favorites ({} problems)",
            favorites.len(),
            report.errors.len()
        );
        report
    }

    pub async fn get_storage_stats(&self) -> StorageStats {
        let favorites = self.get_favorites().await;
        let history = self.get_history().await;
        let settings = self.get_settings().await;

        let size = |value: serde_json::Result<String>| value.map(|s| s.len()).unwrap_or(0);
        let storage_used = size(serde_json::to_string(&favorites))
            + size(serde_json::to_string(&history))
            + size(serde_json::to_string(&settings));

        StorageStats {
            favorites: favorites.len(),
            history: history.len(),
            max_favorites: MAX_FAVORITES,
            max_history: MAX_HISTORY,
            storage_used,
            storage_available: self.is_available().await,
        }
    }
}

/// Checks an imported or restored record and converts it to a `BookIdea`.
/// A missing or unreadable `generatedAt` is set to now.
pub fn validate_idea(raw: &Value) -> Result<BookIdea> {
    let Some(fields) = raw.as_object() else {
        return Err(StoreError::Validation("Idea must be an object".to_string()));
    };

    for field in REQUIRED_FIELDS {
        if !fields.contains_key(field) {
            return Err(StoreError::Validation(format!("Missing required field: {}", field)));
        }
    }
    if !fields["title"].as_array().is_some_and(|title| !title.is_empty()) {
        return Err(StoreError::Validation("Title must be a non-empty array".to_string()));
    }
    if !fields["themes"].is_array() {
        return Err(StoreError::Validation("Themes must be an array".to_string()));
    }

    let mut fields = fields.clone();
    let timestamp_ok = fields
        .get("generatedAt")
        .and_then(Value::as_str)
        .is_some_and(|ts| DateTime::parse_from_rfc3339(ts).is_ok());
    if !timestamp_ok {
        fields.insert("generatedAt".to_string(), serde_json::to_value(Utc::now())?);
    }

    serde_json::from_value(Value::Object(fields))
        .map_err(|e| StoreError::Validation(format!("Invalid format: {}", e)))
}

/// Valid ideas from `items` in order, first occurrence of each id wins,
/// at most `max` of them.
fn collect_valid(label: &str, items: &[Value], max: usize, errors: &mut Vec<String>) -> Vec<BookIdea> {
    let mut seen = HashSet::new();
    let mut ideas = Vec::new();

    for (i, item) in items.iter().enumerate() {
        let idea = match validate_idea(item) {
            Ok(idea) => idea,
            Err(e) => {
                errors.push(format!("{} {}: {}", label, i + 1, e));
                continue;
            }
        };
        if !seen.insert(idea.id.clone()) {
            errors.push(format!("{} {}: Duplicate id {}", label, i + 1, idea.id));
        } else if ideas.len() >= max {
            errors.push(format!("{} {}: Over the limit of {}, dropped", label, i + 1, max));
        } else {
            ideas.push(idea);
        }
    }
    ideas
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::core::idea::{BookType, TargetAge};
    use crate::core::io::MemoryStorage;
    use anyhow::Result;
    use serde_json::json;

    fn idea(id: &str) -> BookIdea {
        BookIdea {
            id: id.to_string(),
            title: vec![format!("Title {}", id)],
            genre: "Fantasy".to_string(),
            concept: "A quiet concept.".to_string(),
            main_character: "a reluctant apprentice".to_string(),
            setting: "a floating city".to_string(),
            conflict: "The runes are failing".to_string(),
            target_audience: TargetAge::Adult,
            opening_line: "It began with a crack.".to_string(),
            themes: vec!["Courage".to_string(), "Sacrifice".to_string()],
            generated_at: Utc::now(),
        }
    }

    fn store() -> (IdeaStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (IdeaStore::new(storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_save_and_list_favorites_most_recent_first() -> Result<()> {
        let (store, _) = store();
        store.save_favorite(&idea("a")).await?;
        store.save_favorite(&idea("b")).await?;

        let ids: Vec<String> = store.get_favorites().await.into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(store.is_idea_saved("a").await);
        assert!(!store.is_idea_saved("z").await);

        // Saving also records history
        assert_eq!(store.get_history().await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_favorite_is_rejected() -> Result<()> {
        let (store, _) = store();
        store.save_favorite(&idea("a")).await?;
        let err = store.save_favorite(&idea("a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(id) if id == "a"));
        assert_eq!(store.get_favorites().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_favorites_capacity() -> Result<()> {
        let (store, _) = store();
        for i in 0..MAX_FAVORITES {
            store.save_favorite(&idea(&format!("idea-{}", i))).await?;
        }
        let err = store.save_favorite(&idea("one-too-many")).await.unwrap_err();
        assert!(matches!(err, StoreError::Capacity { max: 100 }));
        assert_eq!(store.get_favorites().await.len(), MAX_FAVORITES);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_favorite() -> Result<()> {
        let (store, _) = store();
        let err = store.remove_favorite("nonexistent-id").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        store.save_favorite(&idea("a")).await?;
        store.save_favorite(&idea("b")).await?;
        store.remove_favorite("a").await?;
        let ids: Vec<String> = store.get_favorites().await.into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["b"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_favorites_and_history() -> Result<()> {
        let (store, _) = store();
        store.save_favorite(&idea("a")).await?;
        store.clear_favorites().await?;
        assert!(store.get_favorites().await.is_empty());
        assert_eq!(store.get_history().await.len(), 1);

        store.clear_history().await?;
        assert!(store.get_history().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_history_moves_existing_entry_to_front() -> Result<()> {
        let (store, _) = store();
        store.add_to_history(&idea("a")).await;
        store.add_to_history(&idea("b")).await;
        store.add_to_history(&idea("a")).await;

        let ids: Vec<String> = store.get_history().await.into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_history_evicts_oldest_beyond_capacity() -> Result<()> {
        let (store, _) = store();
        for i in 0..(MAX_HISTORY + 10) {
            store.add_to_history(&idea(&format!("h{}", i))).await;
        }

        let history = store.get_history().await;
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history[0].id, format!("h{}", MAX_HISTORY + 9));
        assert_eq!(history[MAX_HISTORY - 1].id, "h10");
        assert!(!history.iter().any(|i| i.id == "h9"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unavailable_storage() -> Result<()> {
        let (store, storage) = store();
        store.save_favorite(&idea("a")).await?;
        storage.set_available(false);

        assert!(!store.is_available().await);
        assert!(store.get_favorites().await.is_empty());
        assert!(store.get_history().await.is_empty());
        assert!(store.get_settings().await.is_empty());
        assert!(!store.is_idea_saved("a").await);

        assert!(matches!(store.save_favorite(&idea("b")).await, Err(StoreError::Storage(_))));
        assert!(matches!(store.remove_favorite("a").await, Err(StoreError::Storage(_))));
        assert!(matches!(store.clear_favorites().await, Err(StoreError::Storage(_))));
        assert!(matches!(store.clear_history().await, Err(StoreError::Storage(_))));
        assert!(matches!(store.save_settings(&Settings::new()).await, Err(StoreError::Storage(_))));

        // Swallowed
        store.add_to_history(&idea("c")).await;

        let stats = store.get_storage_stats().await;
        assert!(!stats.storage_available);
        assert_eq!(stats.favorites, 0);

        storage.set_available(true);
        assert_eq!(store.get_favorites().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupted_collection_reads_as_empty() -> Result<()> {
        let (store, storage) = store();
        storage.write(FAVORITES_KEY, b"{not json").await?;
        assert!(store.get_favorites().await.is_empty());

        // And can be overwritten by a save
        store.save_favorite(&idea("a")).await?;
        assert_eq!(store.get_favorites().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_settings_round_trip() -> Result<()> {
        let (store, _) = store();
        assert!(store.get_settings().await.is_empty());

        let mut settings = Settings::new();
        settings.insert("theme".to_string(), json!("dark"));
        settings.insert("fontSize".to_string(), json!(14));
        store.save_settings(&settings).await?;
        assert_eq!(store.get_settings().await, settings);
        Ok(())
    }

    #[tokio::test]
    async fn test_last_options_are_remembered_next_to_other_settings() -> Result<()> {
        let (store, _) = store();
        assert!(store.last_options().await.is_none());

        let mut settings = Settings::new();
        settings.insert("theme".to_string(), json!("dark"));
        store.save_settings(&settings).await?;

        let options = GeneratorOptions {
            book_type: BookType::NonFiction,
            genre: "Business".to_string(),
            ..GeneratorOptions::default()
        };
        store.remember_options(&options).await?;

        assert_eq!(store.last_options().await, Some(options));
        assert_eq!(store.get_settings().await["theme"], json!("dark"));
        Ok(())
    }

    #[tokio::test]
    async fn test_search_matches_any_term_case_insensitively() -> Result<()> {
        let (store, _) = store();
        let mut dragon = idea("dragon");
        dragon.setting = "a forgotten dragon kingdom".to_string();
        store.save_favorite(&dragon).await?;
        store.save_favorite(&idea("plain")).await?;

        let results = store.search_ideas("dragon kingdom", false).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "dragon");

        let results = store.search_ideas("KINGDOM nothing-else", false).await;
        assert_eq!(results.len(), 1);

        assert!(store.search_ideas("   ", false).await.is_empty());
        assert_eq!(store.search_ideas("courage", false).await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_search_with_history_does_not_repeat_ideas() -> Result<()> {
        let (store, _) = store();
        store.save_favorite(&idea("fav")).await?;
        let mut only_history = idea("hist");
        only_history.genre = "Mystery".to_string();
        store.add_to_history(&only_history).await;

        assert_eq!(store.search_ideas("title", false).await.len(), 1);
        let results = store.search_ideas("title", true).await;
        let ids: Vec<&str> = results.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["fav", "hist"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_filters_by_genre_and_audience() -> Result<()> {
        let (store, _) = store();
        let mut kids = idea("kids");
        kids.genre = "Mystery".to_string();
        kids.target_audience = TargetAge::Children;
        store.save_favorite(&kids).await?;
        store.save_favorite(&idea("adult")).await?;

        assert_eq!(store.get_ideas_by_genre("mystery").await.len(), 1);
        assert_eq!(store.get_ideas_by_genre("FANTASY").await[0].id, "adult");
        assert!(store.get_ideas_by_genre("Horror").await.is_empty());
        assert_eq!(store.get_ideas_by_audience("Children").await[0].id, "kids");
        assert!(store.get_ideas_by_audience("young-adult").await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_export_document_shape() -> Result<()> {
        let (store, _) = store();
        store.save_favorite(&idea("a")).await?;

        let exported: Value = serde_json::from_str(&store.export_favorites().await)?;
        assert_eq!(exported["version"], "1.0");
        assert_eq!(exported["totalIdeas"], 1);
        assert!(exported["exportDate"].is_string());
        assert_eq!(exported["ideas"][0]["id"], "a");
        Ok(())
    }

    #[tokio::test]
    async fn test_reimport_does_not_duplicate() -> Result<()> {
        let (source, _) = store();
        source.save_favorite(&idea("a")).await?;
        source.save_favorite(&idea("b")).await?;
        let exported = source.export_favorites().await;

        let (target, _) = store();
        let first = target.import_favorites(&exported).await;
        assert!(first.success);
        assert_eq!(first.imported, 2);
        assert!(first.errors.is_empty());

        let second = target.import_favorites(&exported).await;
        assert!(!second.success);
        assert_eq!(second.imported, 0);
        assert_eq!(second.errors.len(), 2);
        assert!(second.errors[0].contains("Already exists"));
        assert_eq!(target.get_favorites().await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_validates_each_item() -> Result<()> {
        let (store, _) = store();
        let mut missing_field = serde_json::to_value(idea("x"))?;
        missing_field.as_object_mut().unwrap().remove("concept");
        let mut empty_title = serde_json::to_value(idea("y"))?;
        empty_title["title"] = json!([]);
        let mut no_timestamp = serde_json::to_value(idea("z"))?;
        no_timestamp.as_object_mut().unwrap().remove("generatedAt");

        let document = json!({
            "ideas": [missing_field, empty_title, no_timestamp, serde_json::to_value(idea("z"))?, 42]
        });
        let report = store.import_favorites(&document.to_string()).await;

        assert!(report.success);
        assert_eq!(report.imported, 1);
        assert_eq!(report.errors.len(), 4);
        assert!(report.errors[0].starts_with("Idea 1: "));
        assert!(report.errors[0].contains("Missing required field: concept"));
        assert!(report.errors[1].contains("Title must be a non-empty array"));
        assert!(report.errors[2].contains("Already exists"));
        assert!(report.errors[3].starts_with("Idea 5: "));
        assert_eq!(store.get_favorites().await[0].id, "z");
        Ok(())
    }

    #[tokio::test]
    async fn test_import_rejects_bad_documents() -> Result<()> {
        let (store, _) = store();
        let report = store.import_favorites("not json").await;
        assert!(!report.success);
        assert!(report.errors[0].starts_with("Parse error"));

        let report = store.import_favorites(r#"{"ideas": "nope"}"#).await;
        assert!(report.errors[0].contains("missing or invalid ideas array"));
        Ok(())
    }

    #[tokio::test]
    async fn test_import_stops_at_capacity() -> Result<()> {
        let (store, _) = store();
        for i in 0..(MAX_FAVORITES - 1) {
            store.save_favorite(&idea(&format!("old-{}", i))).await?;
        }
        let ideas: Vec<BookIdea> = (0..3).map(|i| idea(&format!("new-{}", i))).collect();
        let report = store.import_favorites(&json!({ "ideas": ideas }).to_string()).await;

        assert_eq!(report.imported, 1);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].contains("maximum favorites limit (100)"));
        assert_eq!(store.get_favorites().await.len(), MAX_FAVORITES);
        Ok(())
    }

    #[tokio::test]
    async fn test_backup_restore_round_trip() -> Result<()> {
        let (store, _) = store();
        store.save_favorite(&idea("a")).await?;
        store.save_favorite(&idea("b")).await?;
        store.add_to_history(&idea("h")).await;
        let mut settings = Settings::new();
        settings.insert("theme".to_string(), json!("dark"));
        store.save_settings(&settings).await?;

        let favorites = store.get_favorites().await;
        let history = store.get_history().await;
        let backup = store.create_backup().await;

        store.clear_favorites().await?;
        store.clear_history().await?;
        store.save_settings(&Settings::new()).await?;
        store.save_favorite(&idea("other")).await?;

        let report = store.restore_from_backup(&backup).await;
        assert!(report.success, "{:?}", report.errors);
        assert!(report.errors.is_empty());
        assert_eq!(store.get_favorites().await, favorites);
        assert_eq!(store.get_history().await, history);
        assert_eq!(store.get_settings().await, settings);
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_requires_favorites() -> Result<()> {
        let (store, _) = store();
        store.save_favorite(&idea("keep")).await?;

        let report = store.restore_from_backup(r#"{"history": []}"#).await;
        assert!(!report.success);
        assert_eq!(report.errors, vec!["Invalid backup: missing favorites data"]);
        assert_eq!(store.get_favorites().await.len(), 1);

        let report = store.restore_from_backup("{").await;
        assert!(!report.success);
        assert!(report.errors[0].starts_with("Restore failed"));
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_keeps_what_the_backup_lacks() -> Result<()> {
        let (store, _) = store();
        store.add_to_history(&idea("h")).await;
        let mut settings = Settings::new();
        settings.insert("theme".to_string(), json!("light"));
        store.save_settings(&settings).await?;

        let document = json!({
            "favorites": [serde_json::to_value(idea("a"))?, { "id": "broken" }],
            "history": "not a list",
        });
        let report = store.restore_from_backup(&document.to_string()).await;

        assert!(report.success);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].starts_with("Favorite 2: "));
        assert_eq!(store.get_favorites().await.len(), 1);
        assert_eq!(store.get_history().await[0].id, "h");
        assert_eq!(store.get_settings().await, settings);
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_with_empty_favorites_clears_them() -> Result<()> {
        let (store, _) = store();
        store.save_favorite(&idea("a")).await?;
        let report = store.restore_from_backup(r#"{"favorites": []}"#).await;
        assert!(report.success);
        assert!(store.get_favorites().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_storage_stats() -> Result<()> {
        let (store, _) = store();
        let empty = store.get_storage_stats().await;
        assert_eq!(empty.favorites, 0);
        assert_eq!(empty.max_favorites, 100);
        assert_eq!(empty.max_history, 50);
        assert!(empty.storage_available);
        // "[]" + "[]" + "{}"
        assert_eq!(empty.storage_used, 6);

        store.save_favorite(&idea("a")).await?;
        let stats = store.get_storage_stats().await;
        assert_eq!(stats.favorites, 1);
        assert_eq!(stats.history, 1);
        assert!(stats.storage_used > empty.storage_used);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_replaces_unreadable_timestamps() -> Result<()> {
        let (store, _) = store();
        let mut empty = serde_json::to_value(idea("empty"))?;
        empty["generatedAt"] = json!("");
        let mut garbage = serde_json::to_value(idea("garbage"))?;
        garbage["generatedAt"] = json!("last tuesday");
        let mut numeric = serde_json::to_value(idea("numeric"))?;
        numeric["generatedAt"] = json!(0);
        let mut js_style = serde_json::to_value(idea("js"))?;
        js_style["generatedAt"] = json!("2024-05-01T10:00:00.000Z");

        let document = json!({ "ideas": [empty, garbage, numeric, js_style] });
        let report = store.import_favorites(&document.to_string()).await;
        assert!(report.success);
        assert_eq!(report.imported, 4, "{:?}", report.errors);

        let favorites = store.get_favorites().await;
        let kept = favorites.iter().find(|i| i.id == "js").unwrap();
        assert_eq!(kept.generated_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        Ok(())
    }

    #[test]
    fn test_validate_idea_rejects_wrong_types() {
        let mut value = serde_json::to_value(idea("a")).unwrap();
        value["themes"] = json!("Courage");
        assert!(matches!(validate_idea(&value), Err(StoreError::Validation(m)) if m.contains("Themes")));

        let mut value = serde_json::to_value(idea("a")).unwrap();
        value["targetAudience"] = json!("seniors");
        assert!(matches!(validate_idea(&value), Err(StoreError::Validation(m)) if m.starts_with("Invalid format")));

        let mut value = serde_json::to_value(idea("a")).unwrap();
        value["themes"] = json!([]);
        assert!(validate_idea(&value).is_ok());
    }
}
