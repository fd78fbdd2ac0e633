pub mod catalog;
pub mod errors;
pub mod handlers;
pub mod ledger;
pub mod migration;
pub mod profiles;
pub mod progress;
pub mod query;
pub mod ranking;
