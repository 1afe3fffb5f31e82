//! Remote client adapter for the Temporal namespace API.
//!
//! This module provides the [`NamespaceApi`] contract, the shared
//! [`Connection`] handle and the gRPC implementation used in production.

mod api;
mod connection;
mod grpc;
mod proto;

pub use api::NamespaceApi;
pub use connection::Connection;
pub use grpc::{map_status, GrpcNamespaceClient};

#[cfg(test)]
pub use api::MockNamespaceApi;
