//! Agent directory, fetched fresh on every call.

use crate::api::{decode_list, ApiClient};
use estate_core::error::EstateResult;
use estate_core::Agent;
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct AgentsState {
    agents: Vec<Agent>,
    error: Option<String>,
}

pub struct AgentsStore {
    api: ApiClient,
    state: RwLock<AgentsState>,
}

impl AgentsStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: RwLock::new(AgentsState::default()),
        }
    }

    pub fn agents(&self) -> Vec<Agent> {
        self.state.read().agents.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    /// `GET /admin/agents`. On failure the previous list is kept.
    pub async fn get_agents(&self) -> EstateResult<Vec<Agent>> {
        let result = self
            .api
            .get("/admin/agents")
            .await
            .and_then(|body| decode_list::<Agent>(body, "agents"));

        let mut state = self.state.write();
        match result {
            Ok(agents) => {
                tracing::debug!(count = agents.len(), "agents loaded");
                state.agents = agents.clone();
                state.error = None;
                Ok(agents)
            }
            Err(e) => {
                state.error = Some(e.message().to_owned());
                Err(e)
            }
        }
    }
}
