//! services/api/src/lib.rs
//!
//! The Sage auth service: account creation, password and Google sign-in,
//! signed session tokens, and a server-side URL fetcher for the client.

pub mod adapters;
pub mod config;
pub mod error;
pub mod token;
pub mod web;
