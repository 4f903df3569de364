//! Async client core for the Data API content and search service.
//!
//! # Overview
//! `DataApiClient` exposes the six service operations (authenticate,
//! invalidate a session, search, create, read, update). Each one builds a
//! `RequestSpec` and hands it to the `Executor`, which performs the HTTP
//! round-trip, classifies the status code and follows the service's 303
//! redirect convention.
//!
//! # Design
//! - `ClientConfig` (host, port, base path, redirect limit) is fixed at
//!   construction and shared immutably by every call.
//! - The executor is payload-agnostic and returns `serde_json::Value`; the
//!   facade decodes typed records (`Session`, `Content`, `SearchResults`).
//! - `Transport` is the I/O seam. `ReqwestTransport` is the default; tests
//!   plug in scripted transports.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod transport;
pub mod types;

pub use client::DataApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, TransportError};
pub use executor::Executor;
pub use http::{HttpMethod, RequestSpec, ResponseEnvelope};
pub use transport::{ReqwestTransport, Transport};
pub use types::{Content, Credentials, SearchResponse, SearchResults, Session};
