//! Typed client for the App Store Connect REST API.
//!
//! [`AppStoreConnectClient`] signs requests with short-lived ES256 tokens,
//! sends them through one shared connection pool, and decodes JSON:API
//! envelopes into [`Response`] / [`SingleResponse`] over any attribute type.
//! Per-resource methods live in [`resources`].

pub mod asc;
pub mod auth;
pub mod cli;
pub mod config;
pub mod envelope;
pub mod error;
pub mod poll;
pub mod query;
pub mod resources;
pub mod scope;
pub mod util;

pub use asc::AppStoreConnectClient;
pub use config::{ClientOptions, Config};
pub use envelope::{
    Resource, ResourceReference, ResourceType, Response, SingleResponse, decode_list,
    decode_single,
};
pub use error::{ApiError, ApiErrorKind, Error, Result};
pub use query::{ListOptions, ListQuery};
pub use util::{app_label, build_label, build_status, compare_builds_desc};
