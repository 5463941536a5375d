//! Hybrid title recommendation engine.
//!
//! Blends content similarity over catalog feature vectors with collaborative
//! affinities from precomputed latent factors, and serves ranked, explainable
//! results over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
