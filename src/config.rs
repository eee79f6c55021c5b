use crate::{Result, VmError};
use serde::{Deserialize, Serialize};
use std::env;

pub const ENV_MAX_STEPS: &str = "VM16_MAX_STEPS";
pub const ENV_TRACE: &str = "VM16_TRACE";

/// Execution knobs. The default runs without a step limit and without tracing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Fault with `StepLimitExceeded` once this many instructions have retired.
    #[serde(default)]
    pub max_steps: Option<u64>,
    /// Log every instruction at trace level before it executes.
    #[serde(default)]
    pub trace: bool,
}

impl RunConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` with the lookup made explicit.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let max_steps = match lookup(ENV_MAX_STEPS) {
            Some(raw) => parse_max_steps(raw.trim())?,
            None => None,
        };
        let trace = matches!(
            lookup(ENV_TRACE).as_deref(),
            Some("1") | Some("true") | Some("True")
        );
        Ok(Self { max_steps, trace })
    }

    pub fn with_max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.max_steps = max_steps.filter(|&limit| limit > 0);
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

fn parse_max_steps(raw: &str) -> Result<Option<u64>> {
    let limit: u64 = raw
        .parse()
        .map_err(|_| VmError::Config(format!("{ENV_MAX_STEPS} must be a number, got {raw:?}")))?;
    Ok((limit > 0).then_some(limit))
}
