//! Assembly of the environment and variable maps handed to the provisioner.
//!
//! Layering, lowest precedence first:
//!
//! 1. the benchmark secret's `vars`
//! 2. the run's own `vars` overrides
//! 3. run identity (`benchmark_id`, `testrun_id`, `testrun_name`, `test_origin`)
//!
//! The environment map is the secret's `env` as-is.

use serde_json::Value;

use crate::config_map::{parse_config_map, ConfigMap};
use crate::types::DbId;

pub const VAR_BENCHMARK_ID: &str = "benchmark_id";
pub const VAR_TESTRUN_ID: &str = "testrun_id";
pub const VAR_TESTRUN_NAME: &str = "testrun_name";
pub const VAR_TEST_ORIGIN: &str = "test_origin";

/// Identity of the run being provisioned, injected into the variable map.
#[derive(Debug, Clone)]
pub struct RunIdentity<'a> {
    pub benchmark_id: DbId,
    pub run_id: DbId,
    pub name: &'a str,
    pub origin: Option<&'a str>,
}

/// Raw JSON configuration sources for a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunConfigSources<'a> {
    pub secret_env: Option<&'a Value>,
    pub secret_vars: Option<&'a Value>,
    pub run_vars: Option<&'a Value>,
}

/// Environment and variables for one provisioner invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunMaps {
    pub env: ConfigMap,
    pub vars: ConfigMap,
}

/// Build the provisioner maps for a run. Malformed JSON sources are
/// replaced by empty maps (with a logged warning).
pub fn build_run_maps(sources: RunConfigSources<'_>, identity: &RunIdentity<'_>) -> RunMaps {
    let env = parse_config_map(sources.secret_env, "secret.env");

    let mut vars = parse_config_map(sources.secret_vars, "secret.vars");
    vars.extend(parse_config_map(sources.run_vars, "run.vars"));

    vars.insert(VAR_BENCHMARK_ID.into(), identity.benchmark_id.to_string());
    vars.insert(VAR_TESTRUN_ID.into(), identity.run_id.to_string());
    vars.insert(VAR_TESTRUN_NAME.into(), identity.name.to_string());
    if let Some(origin) = identity.origin {
        vars.insert(VAR_TEST_ORIGIN.into(), origin.to_string());
    }

    RunMaps { env, vars }
}
