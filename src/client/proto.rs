//! Wire messages for the Temporal namespace RPCs.
//!
//! Only the fields this provider reads or writes are declared; prost skips
//! unknown fields when decoding. Tags follow `temporal.api.*.v1`.

/// Fully-qualified RPC paths.
pub mod paths {
    pub const REGISTER_NAMESPACE: &str =
        "/temporal.api.workflowservice.v1.WorkflowService/RegisterNamespace";
    pub const DESCRIBE_NAMESPACE: &str =
        "/temporal.api.workflowservice.v1.WorkflowService/DescribeNamespace";
    pub const UPDATE_NAMESPACE: &str =
        "/temporal.api.workflowservice.v1.WorkflowService/UpdateNamespace";
    pub const DELETE_NAMESPACE: &str =
        "/temporal.api.operatorservice.v1.OperatorService/DeleteNamespace";
}

/// `google.protobuf.Duration`
#[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
pub struct Duration {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

/// `google.protobuf.Timestamp`
#[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum NamespaceState {
    Unspecified = 0,
    Registered = 1,
    Deprecated = 2,
    Deleted = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ArchivalState {
    Unspecified = 0,
    Disabled = 1,
    Enabled = 2,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct ClusterReplicationConfig {
    #[prost(string, tag = "1")]
    pub cluster_name: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct RegisterNamespaceRequest {
    #[prost(string, tag = "1")]
    pub namespace: String,
    #[prost(string, tag = "2")]
    pub description: String,
    #[prost(string, tag = "3")]
    pub owner_email: String,
    #[prost(message, optional, tag = "4")]
    pub workflow_execution_retention_period: Option<Duration>,
    #[prost(message, repeated, tag = "5")]
    pub clusters: Vec<ClusterReplicationConfig>,
    #[prost(string, tag = "6")]
    pub active_cluster_name: String,
    #[prost(bool, tag = "9")]
    pub is_global_namespace: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
pub struct RegisterNamespaceResponse {}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct DescribeNamespaceRequest {
    #[prost(string, tag = "1")]
    pub namespace: String,
    #[prost(string, tag = "2")]
    pub id: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct NamespaceInfo {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(enumeration = "NamespaceState", tag = "2")]
    pub state: i32,
    #[prost(string, tag = "3")]
    pub description: String,
    #[prost(string, tag = "4")]
    pub owner_email: String,
    #[prost(string, tag = "6")]
    pub id: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct NamespaceConfig {
    #[prost(enumeration = "ArchivalState", tag = "3")]
    pub history_archival_state: i32,
    #[prost(enumeration = "ArchivalState", tag = "5")]
    pub visibility_archival_state: i32,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct NamespaceReplicationConfig {
    #[prost(string, tag = "1")]
    pub active_cluster_name: String,
    #[prost(message, repeated, tag = "2")]
    pub clusters: Vec<ClusterReplicationConfig>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct FailoverStatus {
    #[prost(message, optional, tag = "1")]
    pub failover_time: Option<Timestamp>,
    #[prost(int64, tag = "2")]
    pub failover_version: i64,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct DescribeNamespaceResponse {
    #[prost(message, optional, tag = "1")]
    pub namespace_info: Option<NamespaceInfo>,
    #[prost(message, optional, tag = "2")]
    pub config: Option<NamespaceConfig>,
    #[prost(message, optional, tag = "3")]
    pub replication_config: Option<NamespaceReplicationConfig>,
    #[prost(int64, tag = "4")]
    pub failover_version: i64,
    #[prost(bool, tag = "5")]
    pub is_global_namespace: bool,
    #[prost(message, repeated, tag = "6")]
    pub failover_history: Vec<FailoverStatus>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct UpdateNamespaceInfo {
    #[prost(string, tag = "1")]
    pub description: String,
    #[prost(string, tag = "2")]
    pub owner_email: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct UpdateNamespaceRequest {
    #[prost(string, tag = "1")]
    pub namespace: String,
    #[prost(message, optional, tag = "2")]
    pub update_info: Option<UpdateNamespaceInfo>,
}

#[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
pub struct UpdateNamespaceResponse {}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct DeleteNamespaceRequest {
    #[prost(string, tag = "1")]
    pub namespace: String,
    #[prost(string, tag = "2")]
    pub namespace_id: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct DeleteNamespaceResponse {
    #[prost(string, tag = "1")]
    pub deleted_namespace: String,
}
