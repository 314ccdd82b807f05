pub mod budget;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod expenses;
pub mod extractor;
pub mod models;
pub mod redis;
pub mod relay;
pub mod session;
pub mod store;
pub mod transport;

use std::sync::Arc;

use crate::budget::BudgetAdvisor;
use crate::config::{Config, StoreBackend};
use crate::endpoint::{CompletionEndpoint, CredentialSource, Sampling};
use crate::error::Result;
use crate::expenses::{ExpenseStore, MemoryExpenseStore, RedisExpenseStore};
use crate::extractor::TripExtractor;
use crate::redis::RedisManager;
use crate::relay::{HttpRelayClient, RelayClient};
use crate::session::ChatSession;
use crate::store::{MemoryTripStore, RedisTripStore, TripStore};
use crate::transport::OpenAiTransport;

/// Completion endpoint wired to the real provider.
pub fn endpoint_from_config(cfg: &Config) -> CompletionEndpoint {
    let transport = Arc::new(OpenAiTransport::new(cfg.provider.api_url.clone()));
    CompletionEndpoint::new(
        transport,
        CredentialSource::Env(cfg.provider.api_key_env.clone()),
        Sampling::from(&cfg.provider),
    )
}

/// Client-side bundle: relay, extractor and the two storage slots.
pub struct TripPlanner {
    relay: Arc<dyn RelayClient>,
    trips: Arc<dyn TripStore>,
    pub extractor: TripExtractor,
    pub expenses: Arc<dyn ExpenseStore>,
}

impl TripPlanner {
    pub fn new(
        relay: Arc<dyn RelayClient>,
        trips: Arc<dyn TripStore>,
        expenses: Arc<dyn ExpenseStore>,
    ) -> Self {
        let extractor = TripExtractor::new(Arc::clone(&relay), Arc::clone(&trips));
        Self {
            relay,
            trips,
            extractor,
            expenses,
        }
    }

    pub async fn from_config(cfg: &Config) -> Result<Self> {
        let relay: Arc<dyn RelayClient> = Arc::new(HttpRelayClient::from_config(&cfg.relay));

        let (trips, expenses): (Arc<dyn TripStore>, Arc<dyn ExpenseStore>) =
            match cfg.store.backend {
                StoreBackend::Memory => (
                    Arc::new(MemoryTripStore::new()),
                    Arc::new(MemoryExpenseStore::new()),
                ),
                StoreBackend::Redis => {
                    let redis = Arc::new(RedisManager::new_with_config(cfg).await?);
                    (
                        Arc::new(RedisTripStore::new(redis.clone(), cfg.trip_key())),
                        Arc::new(RedisExpenseStore::new(redis, cfg.expenses_key())),
                    )
                }
            };

        Ok(Self::new(relay, trips, expenses))
    }

    pub fn chat(&self) -> ChatSession {
        ChatSession::new(Arc::clone(&self.relay))
    }

    pub fn advisor(&self) -> BudgetAdvisor {
        BudgetAdvisor::new(
            Arc::clone(&self.relay),
            Arc::clone(&self.trips),
            Arc::clone(&self.expenses),
        )
    }
}
