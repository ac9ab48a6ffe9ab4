//! REST API client module for eToro services.
//!
//! This module provides the `ApiClient` for communicating with the eToro
//! API gateway. Every request carries the `Ocp-Apim-Subscription-Key`
//! header; a granting location is obtained once per client at connect.

pub mod client;
pub mod error;

pub use client::{ApiClient, ConnectionState, SUBSCRIPTION_KEY_HEADER};
pub use error::ApiError;
