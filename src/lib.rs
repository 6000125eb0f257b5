//! Caching client for the halakat tutoring platform API.
//!
//! [`session::Session`] wires one [`api::HttpClient`] and one shared
//! [`cache::RequestCache`] into a [`store::ResourceStore`] per resource.
//! The `halakat` binary is a thin CLI over these stores.

pub mod api;
pub mod cache;
pub mod config;
pub mod logging;
pub mod session;
pub mod store;
