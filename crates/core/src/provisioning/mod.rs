//! Infrastructure provisioning for benchmark runs.
//!
//! [`Provisioner`] is the seam between the run lifecycle and the
//! infrastructure-as-code tool. [`TerraformProvisioner`] drives the
//! terraform CLI as a subprocess, streaming its output into the log.

pub mod provisioner;
pub mod subprocess;
pub mod terraform;

pub use provisioner::{ProvisionError, Provisioner};
pub use terraform::{ProvisionerCredentials, TerraformProvisioner};
