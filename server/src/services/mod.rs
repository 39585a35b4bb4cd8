pub mod aggregation;
pub mod catalog;
pub mod feedback;
pub mod ledger;
pub mod lifecycle;
pub mod notifications;
pub mod profiles;

pub use aggregation::StatsService;
pub use catalog::EventCatalog;
pub use feedback::FeedbackDesk;
pub use ledger::RegistrationLedger;
pub use notifications::Inbox;
pub use profiles::Profiles;
