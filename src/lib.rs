pub mod config;
pub mod domain;
pub mod forward;
pub mod mail;
pub mod store;
