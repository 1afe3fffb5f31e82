//! Configuration for the provider.
//!
//! This module handles all configuration-related functionality:
//! - Parsing `temporal.provider.yaml` manifests and `.env` files
//! - Resolving provider settings into a dialable endpoint
//! - Fingerprinting specs and manifests for change detection

mod hash;
mod parser;
mod provider;

pub use hash::SpecHasher;
pub use parser::{find_config_file, ConfigParser, Manifest, DEFAULT_CONFIG_FILES};
pub use provider::{EndpointConfig, ProviderConfig, RetryConfig, ENV_HOST, ENV_PORT};
