//! Endpoint methods for individual resource families.
//!
//! Each one is a thin layer over the generic calls on
//! [`AppStoreConnectClient`](crate::asc::AppStoreConnectClient): it
//! validates identifiers, picks the path, and names the attribute type.

pub mod apps;
pub mod beta_groups;
pub mod builds;

pub use apps::{AppAttributes, AppsQuery};
pub use beta_groups::{BetaGroupAttributes, BetaGroupsQuery, CreateBetaGroup};
pub use builds::{BuildAttributes, BuildsQuery, ProcessingState};
