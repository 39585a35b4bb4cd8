use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::repository::AppRegistry;
use crate::services::{EventCatalog, FeedbackDesk, Inbox, Profiles, RegistrationLedger, StatsService};

/// Shared handler state. Services are cheap handles over the registry's
/// repositories.
#[derive(Clone)]
pub struct AppState {
    ledger: RegistrationLedger,
    catalog: EventCatalog,
    stats: StatsService,
    feedback: FeedbackDesk,
    inbox: Inbox,
    profiles: Profiles,
}

impl AppState {
    pub fn new(registry: AppRegistry) -> Self {
        Self::with_clock(registry, Arc::new(SystemClock))
    }

    pub fn with_clock(registry: AppRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: RegistrationLedger::new(&registry, clock.clone()),
            catalog: EventCatalog::new(&registry, clock.clone()),
            stats: StatsService::new(&registry, clock.clone()),
            feedback: FeedbackDesk::new(&registry, clock.clone()),
            inbox: Inbox::new(&registry),
            profiles: Profiles::new(&registry, clock),
        }
    }

    pub fn ledger(&self) -> &RegistrationLedger {
        &self.ledger
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    pub fn stats(&self) -> &StatsService {
        &self.stats
    }

    pub fn feedback(&self) -> &FeedbackDesk {
        &self.feedback
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    pub fn profiles(&self) -> &Profiles {
        &self.profiles
    }
}
