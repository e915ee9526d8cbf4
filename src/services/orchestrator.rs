//! Orchestrator façade
//!
//! Named actions are forwarded to the orchestrator agent, which routes them
//! to the specialised agents. Payloads pass through untouched.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::{
    agents::{AgentName, AgentRegistry},
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorAction {
    RequestRental,
    MatchItems,
    PriceRental,
    EvaluateTrust,
    VerifyDamage,
    ProcessPayouts,
    EngageUsers,
}

impl OrchestratorAction {
    pub const ALL: [OrchestratorAction; 7] = [
        OrchestratorAction::RequestRental,
        OrchestratorAction::MatchItems,
        OrchestratorAction::PriceRental,
        OrchestratorAction::EvaluateTrust,
        OrchestratorAction::VerifyDamage,
        OrchestratorAction::ProcessPayouts,
        OrchestratorAction::EngageUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestratorAction::RequestRental => "request_rental",
            OrchestratorAction::MatchItems => "match_items",
            OrchestratorAction::PriceRental => "price_rental",
            OrchestratorAction::EvaluateTrust => "evaluate_trust",
            OrchestratorAction::VerifyDamage => "verify_damage",
            OrchestratorAction::ProcessPayouts => "process_payouts",
            OrchestratorAction::EngageUsers => "engage_users",
        }
    }
}

impl fmt::Display for OrchestratorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrchestratorAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown orchestrator action: {}", s)))
    }
}

#[derive(Clone)]
pub struct OrchestratorService {
    agents: AgentRegistry,
}

impl OrchestratorService {
    pub fn new(agents: AgentRegistry) -> Self {
        Self { agents }
    }

    pub async fn forward(&self, action: &str, payload: Value) -> AppResult<Value> {
        let action: OrchestratorAction = action.parse()?;
        tracing::debug!("Forwarding {} to orchestrator", action);

        let answer = self
            .agents
            .invoke(
                AgentName::Orchestrator,
                json!({ "action": action, "payload": payload }),
            )
            .await?;
        Ok(answer)
    }
}
