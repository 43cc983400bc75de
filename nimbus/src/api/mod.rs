//! Nimbus REST API client
//!
//! One path-prefixed gateway host serves every platform service; the
//! service modules add their DTOs and `Client` methods on top of the
//! shared HTTP plumbing in [`client`].

pub mod client;
pub mod common;
pub mod error;
pub mod wait;

pub mod dbaas;
pub mod iaas;
pub mod loadbalancer;
pub mod objectstorage;
pub mod ske;
pub mod secretsmanager;

pub use client::{Client, RetryConfig};
pub use error::ApiError;
