use std::collections::BTreeMap;
use std::sync::Mutex;

use ckan::Dataset;
use serde::Serialize;

pub const STORAGE_KEY: &str = "urudat_favorites";

/// Key-value storage the favorites are persisted into.
pub trait FavoritesStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl FavoritesStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_owned(), value);
    }
}

/// A dataset snapshot with the local favorite flag attached.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FavoriteDataset {
    #[serde(flatten)]
    pub dataset: Dataset,
    pub is_favorite: bool,
}

/// Datasets the user starred, keyed by id, with the snapshot taken when
/// they were starred.
pub struct FavoritesStore<S> {
    storage: S,
    favorites: BTreeMap<String, Dataset>,
}

impl<S: FavoritesStorage> FavoritesStore<S> {
    /// Read the stored favorites. Unreadable contents start an empty set.
    pub fn load(storage: S) -> Self {
        let favorites = match storage.get(STORAGE_KEY) {
            None => BTreeMap::new(),
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Discarding unreadable favorites: {}", e);
                BTreeMap::new()
            }),
        };
        Self { storage, favorites }
    }

    fn persist(&self) -> Result<(), serde_json::Error> {
        let raw = serde_json::to_string(&self.favorites)?;
        self.storage.set(STORAGE_KEY, raw);
        Ok(())
    }

    /// Add or remove the dataset. Returns whether it is now a favorite.
    pub fn toggle(&mut self, dataset: &Dataset) -> Result<bool, serde_json::Error> {
        let added = if self.favorites.remove(&dataset.id).is_some() {
            false
        } else {
            self.favorites.insert(dataset.id.clone(), dataset.clone());
            true
        };
        self.persist()?;
        Ok(added)
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.contains_key(id)
    }

    pub fn list(&self) -> Vec<&Dataset> {
        self.favorites.values().collect()
    }

    pub fn annotate(&self, dataset: &Dataset) -> FavoriteDataset {
        FavoriteDataset {
            dataset: dataset.clone(),
            is_favorite: self.is_favorite(&dataset.id),
        }
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}
