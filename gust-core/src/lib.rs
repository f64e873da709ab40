//! Core library for the `gust` weather CLI.
//!
//! This crate defines:
//! - Browser login through a loopback callback ([`auth`])
//! - A weather API client that tracks the server's rate limit ([`client`], [`quota`])
//! - Typed client options and shared payload models
//!
//! It is used by `gust-cli`, but can also be reused by other binaries or services.
//! Persisting the issued [`Credential`] is left to the caller.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod quota;

pub use auth::{AuthError, Authenticator, Credential, authenticate};
pub use client::{QuotaClient, WeatherSource};
pub use config::{AuthenticatorOptions, ClientOptions, OptionsError, Units};
pub use error::{ApiError, ApiErrorKind, ClientError, QuotaError};
pub use model::{City, WeatherResponse};
pub use quota::{QuotaLevel, QuotaSnapshot};
