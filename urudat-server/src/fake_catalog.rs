use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ckan::{Action, CatalogApi, CatalogError, Params};
use serde_json::Value;

/// Scripted [CatalogApi] that records every call it receives.
#[derive(Default)]
pub struct FakeCatalog {
    responses: HashMap<Action, Result<Value, CatalogError>>,
    calls: Mutex<Vec<(Action, Params)>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, action: Action, response: Result<Value, CatalogError>) -> Self {
        self.responses.insert(action, response);
        self
    }

    pub fn calls(&self) -> Vec<(Action, Params)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn call(&self, action: Action, params: &Params) -> Result<Value, CatalogError> {
        self.calls.lock().unwrap().push((action, params.clone()));
        self.responses.get(&action).cloned().unwrap_or_else(|| {
            Err(CatalogError::Transport(format!("no response scripted for {action}")))
        })
    }
}
