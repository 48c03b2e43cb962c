pub mod aggregate;
pub mod cart;
pub mod catalog;
pub mod errors;
pub mod metrics;
pub mod order;
pub mod ports;
pub mod status;
pub mod user;
