//! Transactional storage for orders, inventory and customers.
//!
//! Every engine operation runs inside one [`UnitOfWork`] obtained from a
//! [`TransactionalStore`]. Two implementations share the same interface:
//! [`InMemoryStore`] for tests and local runs, and [`PostgresStore`].

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTx};
pub use postgres::{PostgresStore, PostgresTx};
pub use store::{CustomerStore, InventoryStore, OrderStore, TransactionalStore, UnitOfWork};
