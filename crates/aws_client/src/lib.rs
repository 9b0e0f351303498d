//! AWS implementations of the remote interfaces used by `aws_vars_core`.
//!
//! - [`SsmParameterStore`] reads `ansible_vars` entries from Systems Manager
//!   Parameter Store.
//! - [`ImdsClient`] reads instance tags (and role credentials) from the EC2
//!   instance metadata service.
//!
//! Requests to Parameter Store are signed with SigV4 using credentials from
//! the environment or from the instance role.

pub mod credentials;
pub mod errors;
pub mod imds;
pub mod sigv4;
pub mod ssm;

pub use credentials::{AwsCredentials, CredentialsProvider};
pub use errors::Error;
pub use imds::{ImdsClient, ImdsConfig, DEFAULT_IMDS_ENDPOINT, DEFAULT_IMDS_TIMEOUT};
pub use ssm::{SsmConfig, SsmParameterStore, DEFAULT_REGION, DEFAULT_SSM_TIMEOUT};
