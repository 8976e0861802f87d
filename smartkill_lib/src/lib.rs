//! Victor Smart-Kill API client library.
//!
//! Provides an authenticating client for the Smart-Kill REST API and typed access
//! to traps, activity logs, users, profiles, operators, and mobile app versions.

pub mod api;
pub mod client;
pub mod decoder;
pub mod error;
pub mod helpers;
pub mod models;
pub mod schema;
pub mod secret;

pub use api::Api;
pub use client::{Client, ClientConfig, Credentials};
pub use decoder::ResponseDecoder;
pub use error::{AuthError, ConfigError, Error, HttpError, MappingError};
pub use helpers::{
    format_timestamp_display, get_credentials, parse_resource_url, resource_id_from_url,
    ParsedResourceUrl,
};
pub use models::{
    Activity, MobileApp, Operator, Profile, Resource, TermsAndConditions, Trap, TrapStatistics,
    User,
};
pub use schema::{Entity, UnknownFields};
pub use secret::SecretBackend;

/// Library version for User-Agent and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
