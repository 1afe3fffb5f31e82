//! gRPC implementation of [`NamespaceApi`] against the Temporal frontend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::{Code, Request, Status};
use tracing::{debug, trace};

use crate::error::{ProviderError, RemoteError, Result};
use crate::model::{
    ArchivalState, FailoverRecord, NamespaceSpec, NamespaceState, ResourceState,
};

use super::api::NamespaceApi;
use super::connection::Connection;
use super::proto::{self, paths};

/// Workflow retention applied to newly registered namespaces.
const DEFAULT_RETENTION_SECS: i64 = 72 * 60 * 60;

/// Namespace client speaking the Temporal gRPC API.
#[derive(Debug, Clone)]
pub struct GrpcNamespaceClient {
    connection: Connection,
}

impl GrpcNamespaceClient {
    /// Creates a client on top of an established connection.
    #[must_use]
    pub const fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// The connection this client sends requests through.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    async fn unary<Req, Resp>(&self, path: &'static str, message: Req) -> Result<Resp>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let channel = self.connection.channel().await?;
        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready()
            .await
            .map_err(|e| RemoteError::unavailable(format!("channel not ready: {e}")))?;

        let mut request = Request::new(message);
        request.set_timeout(self.connection.request_timeout());

        trace!(path, "Sending Temporal request");
        let response = grpc
            .unary(
                request,
                PathAndQuery::from_static(path),
                tonic_prost::ProstCodec::default(),
            )
            .await
            .map_err(map_status)?;

        Ok(response.into_inner())
    }

    async fn describe(&self, request: proto::DescribeNamespaceRequest) -> Result<ResourceState> {
        let response: proto::DescribeNamespaceResponse =
            self.unary(paths::DESCRIBE_NAMESPACE, request).await?;
        state_from_response(response)
    }
}

#[async_trait]
impl NamespaceApi for GrpcNamespaceClient {
    async fn create(&self, spec: &NamespaceSpec) -> Result<ResourceState> {
        debug!(namespace = %spec.name, "Registering namespace");

        let request = proto::RegisterNamespaceRequest {
            namespace: spec.name.clone(),
            description: spec.description.clone(),
            owner_email: spec.owner_email.clone(),
            workflow_execution_retention_period: Some(proto::Duration {
                seconds: DEFAULT_RETENTION_SECS,
                nanos: 0,
            }),
            ..Default::default()
        };
        let _: proto::RegisterNamespaceResponse =
            self.unary(paths::REGISTER_NAMESPACE, request).await?;

        // Registration returns no body; describe for the authoritative state.
        self.get_by_name(&spec.name).await
    }

    async fn get(&self, id: &str) -> Result<ResourceState> {
        debug!(id, "Describing namespace");

        self.describe(proto::DescribeNamespaceRequest {
            id: id.to_string(),
            ..Default::default()
        })
        .await
    }

    async fn get_by_name(&self, name: &str) -> Result<ResourceState> {
        debug!(namespace = name, "Describing namespace by name");

        self.describe(proto::DescribeNamespaceRequest {
            namespace: name.to_string(),
            ..Default::default()
        })
        .await
    }

    async fn update(&self, id: &str, spec: &NamespaceSpec) -> Result<ResourceState> {
        debug!(id, namespace = %spec.name, "Updating namespace");

        let request = proto::UpdateNamespaceRequest {
            namespace: spec.name.clone(),
            update_info: Some(proto::UpdateNamespaceInfo {
                description: spec.description.clone(),
                owner_email: spec.owner_email.clone(),
            }),
        };
        let _: proto::UpdateNamespaceResponse =
            self.unary(paths::UPDATE_NAMESPACE, request).await?;

        // The update response carries no failover history.
        self.get(id).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        debug!(id, "Deleting namespace");

        let request = proto::DeleteNamespaceRequest {
            namespace_id: id.to_string(),
            ..Default::default()
        };
        let response: proto::DeleteNamespaceResponse =
            self.unary(paths::DELETE_NAMESPACE, request).await?;

        trace!(id, renamed_to = %response.deleted_namespace, "Namespace deleted");
        Ok(())
    }
}

/// Translates a gRPC status into the crate error taxonomy.
#[must_use]
pub fn map_status(status: Status) -> ProviderError {
    let message = status.message().to_string();

    let remote = match status.code() {
        Code::NotFound => RemoteError::NotFound { message },
        Code::AlreadyExists => RemoteError::AlreadyExists { message },
        Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => {
            RemoteError::Validation { message }
        }
        Code::PermissionDenied | Code::Unauthenticated => RemoteError::PermissionDenied { message },
        Code::Unavailable | Code::ResourceExhausted | Code::DeadlineExceeded | Code::Aborted => {
            RemoteError::Unavailable { message }
        }
        Code::Cancelled => return ProviderError::cancelled(message),
        code => RemoteError::Internal {
            code: format!("{code:?}"),
            message,
        },
    };

    remote.into()
}

fn state_from_response(response: proto::DescribeNamespaceResponse) -> Result<ResourceState> {
    let info = response
        .namespace_info
        .ok_or_else(|| RemoteError::invalid_response("describe response has no namespace info"))?;

    if info.id.is_empty() {
        return Err(RemoteError::invalid_response("describe response has no namespace id").into());
    }

    let state = match proto::NamespaceState::try_from(info.state) {
        Ok(proto::NamespaceState::Registered) => NamespaceState::Registered,
        Ok(proto::NamespaceState::Deprecated) => NamespaceState::Deprecated,
        Ok(proto::NamespaceState::Deleted) => NamespaceState::Deleted,
        Ok(proto::NamespaceState::Unspecified) | Err(_) => {
            return Err(RemoteError::invalid_response(format!(
                "namespace '{}' has unrecognized state {}",
                info.name, info.state
            ))
            .into());
        }
    };

    let config = response.config.unwrap_or_default();
    let replication = response.replication_config.unwrap_or_default();

    Ok(ResourceState {
        id: info.id,
        name: info.name,
        description: info.description,
        owner_email: info.owner_email,
        state,
        active_cluster_name: replication.active_cluster_name,
        clusters: replication
            .clusters
            .into_iter()
            .map(|c| c.cluster_name)
            .collect(),
        history_archival_state: archival_state(config.history_archival_state),
        visibility_archival_state: archival_state(config.visibility_archival_state),
        is_global: response.is_global_namespace,
        failover_version: response.failover_version,
        failover_history: response
            .failover_history
            .into_iter()
            .map(|entry| FailoverRecord {
                failover_time: entry.failover_time.and_then(timestamp),
                failover_version: entry.failover_version,
            })
            .collect(),
    })
}

fn archival_state(value: i32) -> ArchivalState {
    match proto::ArchivalState::try_from(value) {
        Ok(proto::ArchivalState::Disabled) => ArchivalState::Disabled,
        Ok(proto::ArchivalState::Enabled) => ArchivalState::Enabled,
        Ok(proto::ArchivalState::Unspecified) | Err(_) => ArchivalState::Unspecified,
    }
}

fn timestamp(ts: proto::Timestamp) -> Option<DateTime<Utc>> {
    u32::try_from(ts.nanos)
        .ok()
        .and_then(|nanos| DateTime::from_timestamp(ts.seconds, nanos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn describe_response() -> proto::DescribeNamespaceResponse {
        proto::DescribeNamespaceResponse {
            namespace_info: Some(proto::NamespaceInfo {
                name: String::from("billing"),
                state: proto::NamespaceState::Registered as i32,
                description: String::from("Billing workflows"),
                owner_email: String::from("billing@example.com"),
                id: String::from("ns-123"),
            }),
            config: Some(proto::NamespaceConfig {
                history_archival_state: proto::ArchivalState::Enabled as i32,
                visibility_archival_state: proto::ArchivalState::Disabled as i32,
            }),
            replication_config: Some(proto::NamespaceReplicationConfig {
                active_cluster_name: String::from("primary"),
                clusters: vec![
                    proto::ClusterReplicationConfig {
                        cluster_name: String::from("primary"),
                    },
                    proto::ClusterReplicationConfig {
                        cluster_name: String::from("secondary"),
                    },
                ],
            }),
            failover_version: 12,
            is_global_namespace: true,
            failover_history: vec![proto::FailoverStatus {
                failover_time: Some(proto::Timestamp {
                    seconds: 1_700_000_000,
                    nanos: 0,
                }),
                failover_version: 2,
            }],
        }
    }

    #[test]
    fn test_state_from_response_populates_computed_fields() {
        let state = state_from_response(describe_response()).expect("valid response");

        assert_eq!(state.id, "ns-123");
        assert_eq!(state.name, "billing");
        assert_eq!(state.state, NamespaceState::Registered);
        assert_eq!(state.active_cluster_name, "primary");
        assert_eq!(state.clusters, vec!["primary", "secondary"]);
        assert_eq!(state.history_archival_state, ArchivalState::Enabled);
        assert_eq!(state.visibility_archival_state, ArchivalState::Disabled);
        assert!(state.is_global);
        assert_eq!(state.failover_version, 12);
        assert_eq!(state.failover_history.len(), 1);
        assert_eq!(
            state.failover_history[0].failover_time,
            DateTime::from_timestamp(1_700_000_000, 0)
        );
    }

    #[test]
    fn test_response_without_info_is_invalid() {
        let mut response = describe_response();
        response.namespace_info = None;

        let err = state_from_response(response).expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Remote);
    }

    #[test]
    fn test_unspecified_state_is_invalid() {
        let mut response = describe_response();
        if let Some(info) = response.namespace_info.as_mut() {
            info.state = proto::NamespaceState::Unspecified as i32;
        }

        assert!(state_from_response(response).is_err());
    }

    #[test]
    fn test_deleted_state_is_reported() {
        let mut response = describe_response();
        if let Some(info) = response.namespace_info.as_mut() {
            info.state = proto::NamespaceState::Deleted as i32;
        }

        let state = state_from_response(response).expect("valid response");
        assert!(state.is_deleted());
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Code::NotFound, ErrorKind::NotFound),
            (Code::AlreadyExists, ErrorKind::AlreadyExists),
            (Code::InvalidArgument, ErrorKind::Validation),
            (Code::FailedPrecondition, ErrorKind::Validation),
            (Code::PermissionDenied, ErrorKind::PermissionDenied),
            (Code::Unauthenticated, ErrorKind::PermissionDenied),
            (Code::Unavailable, ErrorKind::Unavailable),
            (Code::ResourceExhausted, ErrorKind::Unavailable),
            (Code::DeadlineExceeded, ErrorKind::Unavailable),
            (Code::Cancelled, ErrorKind::Cancelled),
            (Code::Internal, ErrorKind::Remote),
            (Code::Unknown, ErrorKind::Remote),
        ];

        for (code, kind) in cases {
            assert_eq!(map_status(Status::new(code, "boom")).kind(), kind, "{code:?}");
        }
    }

    #[test]
    fn test_only_transient_codes_are_retryable() {
        assert!(map_status(Status::unavailable("restarting")).is_retryable());
        assert!(!map_status(Status::not_found("gone")).is_retryable());
        assert!(!map_status(Status::internal("bug")).is_retryable());
    }

    #[tokio::test]
    async fn test_calls_fail_fast_without_connection() {
        let client = GrpcNamespaceClient::new(Connection::disconnected("http://localhost:7233"));

        let err = client.get("ns-123").await.expect_err("not connected");
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(!err.is_retryable());
    }
}
