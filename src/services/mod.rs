// Service exports
pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::InMemoryStore;
pub use postgres::{PostgresStore, StateColumn};
pub use store::{MatchStore, StoreError, StoreTx};
