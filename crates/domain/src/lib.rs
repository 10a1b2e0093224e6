//! Domain layer for the order lifecycle.
//!
//! This crate holds the pure rules, with no I/O:
//! - Order entity with its status state machine and derived totals
//! - Order events describing each transition's stock and customer effects
//! - Inventory and customer records with their adjustment rules

pub mod customer;
pub mod inventory;
pub mod order;

pub use customer::{
    Customer, CustomerError, CustomerPatch, CustomerStats, CustomerStatus, NewCustomer,
    StatsAdjustment,
};
pub use inventory::{InventoryItem, NewProduct, StockError, StockStatus, apply_stock_delta};
pub use order::{
    LineItem, LineItems, Money, NewOrder, Order, OrderError, OrderEvent, OrderParts, OrderPatch,
    OrderStatus, Quantity, ReturnOptions, StockMovement, Transition,
};
