//! External agents
//!
//! An agent takes one JSON document and answers with one JSON document. Agents
//! keep no state between calls, so every call is independent and calls may run
//! concurrently. [`ProcessAgent`] runs an agent as a child process; anything
//! else implementing [`Agent`] can be registered in its place.

pub mod process;

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc, time::{Duration, Instant}};

use async_trait::async_trait;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::AgentsConfig;

pub use process::ProcessAgent;

/// Failures of a single agent call
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent '{0}' not found")]
    NotFound(String),

    #[error("Method {0} not allowed, use POST")]
    MethodNotAllowed(String),

    #[error("Failed to start agent '{agent}': {source}")]
    StartFailed {
        agent: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Agent '{agent}' execution failed (exit code {code:?}): {stderr}")]
    ExecutionFailed {
        agent: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Invalid response from agent '{agent}': {reason}")]
    InvalidResponse { agent: String, reason: String },

    #[error("Agent '{agent}' timed out after {after:?}")]
    Timeout { agent: String, after: Duration },
}

/// A single-shot JSON request/response computation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Agent: Send + Sync {
    async fn call(&self, payload: Value) -> Result<Value, AgentError>;
}

/// Agents the server knows how to reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AgentName {
    Orchestrator,
    Matching,
    Pricing,
    Trust,
    Verification,
    Payout,
    Engagement,
}

impl AgentName {
    pub const ALL: [AgentName; 7] = [
        AgentName::Orchestrator,
        AgentName::Matching,
        AgentName::Pricing,
        AgentName::Trust,
        AgentName::Verification,
        AgentName::Payout,
        AgentName::Engagement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Orchestrator => "orchestrator",
            AgentName::Matching => "matching",
            AgentName::Pricing => "pricing",
            AgentName::Trust => "trust",
            AgentName::Verification => "verification",
            AgentName::Payout => "payout",
            AgentName::Engagement => "engagement",
        }
    }

    /// Script path relative to the agents directory
    pub fn default_script(&self) -> &'static str {
        match self {
            AgentName::Orchestrator => "orchestrator/orchestrator.py",
            AgentName::Matching => "matching_agent/matching_agent.py",
            AgentName::Pricing => "pricing_agent/pricing_agent.py",
            AgentName::Trust => "trust_agent/trust_agent.py",
            AgentName::Verification => "verification_agent/main.py",
            AgentName::Payout => "payout_agent/payout_agent.py",
            AgentName::Engagement => "engagement_agent/engagement_agent.py",
        }
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentName {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| AgentError::NotFound(s.to_string()))
    }
}

/// Maps agent names to their implementations
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: HashMap<AgentName, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry running every known agent as a script process
    pub fn from_config(config: &AgentsConfig) -> Self {
        AgentName::ALL.into_iter().fold(Self::new(), |registry, name| {
            let agent = ProcessAgent::script(
                name.as_str(),
                &config.interpreter,
                config.script_for(name),
                config.timeout(),
            );
            registry.register(name, Arc::new(agent))
        })
    }

    pub fn register(mut self, name: AgentName, agent: Arc<dyn Agent>) -> Self {
        self.agents.insert(name, agent);
        self
    }

    pub fn get(&self, name: AgentName) -> Result<Arc<dyn Agent>, AgentError> {
        self.agents
            .get(&name)
            .cloned()
            .ok_or_else(|| AgentError::NotFound(name.to_string()))
    }

    /// Call an agent once
    pub async fn invoke(&self, name: AgentName, payload: Value) -> Result<Value, AgentError> {
        let agent = self.get(name)?;
        let started = Instant::now();
        let result = agent.call(payload).await;
        let elapsed_ms = started.elapsed().as_millis();

        match &result {
            Ok(_) => tracing::info!(agent = %name, elapsed_ms, "Agent call succeeded"),
            Err(e) => tracing::warn!(agent = %name, elapsed_ms, "Agent call failed: {}", e),
        }

        result
    }

    /// Entry point for externally named calls. The name is checked before the
    /// method; nothing runs unless both are accepted.
    pub async fn dispatch(
        &self,
        method: &Method,
        name: &str,
        payload: Value,
    ) -> Result<Value, AgentError> {
        let name: AgentName = name.parse()?;

        if method != Method::POST {
            return Err(AgentError::MethodNotAllowed(method.to_string()));
        }

        self.invoke(name, payload).await
    }
}
