//! Session-aware API client and cached data stores for Estate.

pub mod admin;
pub mod agents;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod favorites;
pub mod properties;
pub mod session;
pub mod token_store;
pub mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

use async_trait::async_trait;
use estate_core::error::EstateResult;
use std::sync::Arc;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use properties::PrefetchReport;
pub use session::{AuthState, SessionEvent, SessionService};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use transport::{ApiRequest, HttpTransport, Method, RawResponse, TransportError};

/// Abstraction over whatever actually carries requests to the API.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError>;
}

/// Every store wired to one session and one transport.
///
/// ```ignore
/// let client = EstateClient::connect(ClientConfig::from_env()?)?;
/// client.auth().load_user().await?;
/// let listings = client.properties().get_properties(&PropertyQuery::new()).await?;
/// ```
pub struct EstateClient {
    session: Arc<SessionService>,
    auth: auth::AuthStore,
    properties: properties::PropertiesStore,
    agents: agents::AgentsStore,
    favorites: favorites::FavoritesStore,
    admin: admin::AdminApi,
}

impl EstateClient {
    /// HTTP transport, with the token persisted to `config.token_file` when
    /// set and kept in memory otherwise.
    pub fn connect(config: ClientConfig) -> EstateResult<Self> {
        let store: Arc<dyn TokenStore> = match &config.token_file {
            Some(path) => Arc::new(FileTokenStore::new(path.clone())),
            None => Arc::new(MemoryTokenStore::default()),
        };
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::with_transport(transport, store, &config)
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        config: &ClientConfig,
    ) -> EstateResult<Self> {
        let session = Arc::new(SessionService::new(store)?);
        let api = ApiClient::new(transport, Arc::clone(&session));

        Ok(Self {
            auth: auth::AuthStore::new(api.clone()),
            properties: properties::PropertiesStore::new(api.clone())
                .with_concurrency(config.prefetch_concurrency),
            agents: agents::AgentsStore::new(api.clone()),
            favorites: favorites::FavoritesStore::new(api.clone()),
            admin: admin::AdminApi::new(api),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionService> {
        &self.session
    }

    pub fn auth(&self) -> &auth::AuthStore {
        &self.auth
    }

    pub fn properties(&self) -> &properties::PropertiesStore {
        &self.properties
    }

    pub fn agents(&self) -> &agents::AgentsStore {
        &self.agents
    }

    pub fn favorites(&self) -> &favorites::FavoritesStore {
        &self.favorites
    }

    pub fn admin(&self) -> &admin::AdminApi {
        &self.admin
    }
}
