//! Wealth onboarding: registration wizard and login client.

pub mod backend;
pub mod config;
pub mod error;
pub mod login;
pub mod registration;
pub mod session;
