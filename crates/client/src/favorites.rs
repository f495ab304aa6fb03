//! The signed-in user's saved listings.

use crate::api::{decode_list, path_id, ApiClient};
use crate::transport::ApiRequest;
use estate_core::error::EstateResult;
use estate_core::Property;
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug, Default)]
struct FavoritesState {
    items: Vec<Property>,
    ids: HashSet<String>,
}

pub struct FavoritesStore {
    api: ApiClient,
    state: RwLock<FavoritesState>,
}

impl FavoritesStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: RwLock::new(FavoritesState::default()),
        }
    }

    /// Last fetched favorites.
    pub fn items(&self) -> Vec<Property> {
        self.state.read().items.clone()
    }

    /// Answers from the last fetched list; no request.
    pub fn contains(&self, id: &str) -> bool {
        self.state.read().ids.contains(id.trim())
    }

    /// `GET /auth/favorites`.
    pub async fn list(&self) -> EstateResult<Vec<Property>> {
        let body = self.api.get("/auth/favorites").await?;
        let items = decode_list::<Property>(body, "favorites")?;

        let mut state = self.state.write();
        state.ids = items.iter().map(|p| p.id.clone()).collect();
        state.items = items.clone();
        Ok(items)
    }

    /// `PUT /auth/favorites/:id`.
    pub async fn add(&self, id: &str) -> EstateResult<()> {
        let id = path_id(id)?;
        self.api
            .send(ApiRequest::put(format!("/auth/favorites/{id}")))
            .await?;
        self.state.write().ids.insert(id.to_owned());
        tracing::info!(id, "favorite added");
        Ok(())
    }

    /// `DELETE /auth/favorites/:id`.
    pub async fn remove(&self, id: &str) -> EstateResult<()> {
        let id = path_id(id)?;
        self.api.delete(format!("/auth/favorites/{id}")).await?;
        {
            let mut state = self.state.write();
            state.ids.remove(id);
            state.items.retain(|p| p.id != id);
        }
        tracing::info!(id, "favorite removed");
        Ok(())
    }
}
