//! Storage adapters: in-memory (tests, development) and PostgreSQL.

mod in_memory;
mod postgres;

pub use in_memory::{InMemoryPaymentStore, InMemorySubscriptionStore, StaticPlanCatalog};
pub use postgres::{PostgresPaymentStore, PostgresSubscriptionStore};
