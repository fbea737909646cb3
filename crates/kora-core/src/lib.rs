//! # kora-core
//!
//! Core types, traits, configuration, and error handling for the Kora
//! message-routing agent.

pub mod classification;
pub mod command;
pub mod config;
pub mod error;
pub mod message;
pub mod traits;
pub mod user;
