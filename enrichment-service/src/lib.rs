//! Enrichment Service - per-subscriber billing rows assembled from the billing API.

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod startup;
