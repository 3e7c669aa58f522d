pub mod cart;
pub mod catalog;
pub mod config;
pub mod detection;
pub mod order;
