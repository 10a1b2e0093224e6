pub mod customers;
pub mod ops;
pub mod orders;
pub mod products;
