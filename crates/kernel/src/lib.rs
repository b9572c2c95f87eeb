//! Quire Kernel Library
//!
//! Blog content platform backend: the content feed query engine, slug
//! resolution, suggestion sampling, and the HTTP API around them.
//! The main entry point for running the server is the `quire` binary.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
