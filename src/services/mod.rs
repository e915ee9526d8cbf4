//! Business logic services

pub mod catalog;
pub mod damage;
pub mod events;
pub mod ledger;
pub mod orchestrator;
pub mod payouts;
pub mod storage;
pub mod users;

use std::sync::Arc;

use crate::{agents::AgentRegistry, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub agents: AgentRegistry,
    pub events: events::RentalEvents,
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub ledger: ledger::LedgerService,
    pub damage: damage::DamageService,
    pub payouts: payouts::PayoutService,
    pub orchestrator: orchestrator::OrchestratorService,
    pub repository: Repository,
}

impl Services {
    /// Create all services over the given repository, agents and blob store
    pub fn new(
        repository: Repository,
        agents: AgentRegistry,
        blobs: Arc<dyn storage::BlobStore>,
    ) -> Self {
        let events = events::RentalEvents::default();
        let damage = damage::DamageService::new(repository.clone(), agents.clone(), blobs);

        Self {
            users: users::UsersService::new(repository.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            ledger: ledger::LedgerService::new(repository.clone(), damage.clone(), events.clone()),
            payouts: payouts::PayoutService::new(repository.clone(), agents.clone(), events.clone()),
            orchestrator: orchestrator::OrchestratorService::new(agents.clone()),
            damage,
            events,
            agents,
            repository,
        }
    }
}
