pub mod catalog;
pub mod concept;
pub mod config;
pub mod controller;
pub mod platform;
pub mod protocol;
pub mod state;
pub mod transport;
