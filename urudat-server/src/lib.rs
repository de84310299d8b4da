pub mod api_types;
pub mod config;
pub mod error;
pub mod extract;
pub mod facade;
pub mod resolver;
pub mod router;
pub mod sql;
pub mod state;
pub mod view;

#[cfg(test)]
mod fake_catalog;
