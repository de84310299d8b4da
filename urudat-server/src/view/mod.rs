//! Presentation helpers the UI layer renders from: record tables, resource
//! lists and locally kept favorites.

pub mod favorites;
pub mod resources;
pub mod table;

pub use favorites::{FavoriteDataset, FavoritesStorage, FavoritesStore, MemoryStorage};
pub use resources::{format_bytes, preferred_resources, preview_eligibility};
pub use table::{Pagination, SortDirection, TableView, PAGE_SIZE};
