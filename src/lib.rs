//! Library crate for prono-back, exposing modules for binaries and integration tests.

pub mod auth;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod integrations;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod testing;
