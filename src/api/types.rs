//! SimArena API data types and structures

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Round number reserved for the completion step carrying the final result
pub const SENTINEL_ROUND: i32 = -1;

/// Maximum number of rounds the server accepts for one simulation
pub const MAX_ROUNDS: u32 = 20;

/// Lifecycle status of a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    #[default]
    Running,
    Completed,
    Failed,
}

impl SimulationStatus {
    /// Completed and failed simulations never change again
    pub fn is_terminal(self) -> bool {
        !matches!(self, SimulationStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SimulationStatus::Running => "running",
            SimulationStatus::Completed => "completed",
            SimulationStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language the participants speak in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "ru" => Ok(Language::Ru),
            other => Err(format!("unsupported language: {}", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(lenient_parse(Option::<String>::deserialize(deserializer)?))
    }
}

/// How much each participant is allowed to say per turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Shallow,
    #[default]
    Medium,
    Deep,
}

impl Depth {
    pub fn as_str(self) -> &'static str {
        match self {
            Depth::Shallow => "shallow",
            Depth::Medium => "medium",
            Depth::Deep => "deep",
        }
    }
}

impl FromStr for Depth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shallow" => Ok(Depth::Shallow),
            "medium" => Ok(Depth::Medium),
            "deep" => Ok(Depth::Deep),
            other => Err(format!("unsupported depth: {}", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Depth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(lenient_parse(Option::<String>::deserialize(deserializer)?))
    }
}

/// The server may send an empty string for unset enum fields; fall back to the default.
fn lenient_parse<T: FromStr + Default>(value: Option<String>) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or_default()
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

/// Simulation participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// One unit of streamed output from a running simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub round: i32,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub agent_name: String,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Step {
    /// Whether this step announces completion instead of carrying a turn
    pub fn is_sentinel(&self) -> bool {
        self.round == SENTINEL_ROUND
    }
}

/// Simulation session as stored by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub preconditions: String,
    #[serde(default)]
    pub rounds: u32,
    #[serde(default)]
    pub show_only_result: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub depth: Depth,
    pub status: SimulationStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub steps: Vec<Step>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub final_result: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Simulation {
    /// True if any participant was given a role
    pub fn is_interactive(&self) -> bool {
        self.agents.iter().any(|agent| !agent.role.is_empty())
    }

    /// Bring a server snapshot in line with the local invariant:
    /// a final result exists exactly when the simulation completed.
    pub fn normalize(&mut self) {
        match self.status {
            SimulationStatus::Completed => {
                self.final_result.get_or_insert_with(String::new);
            }
            SimulationStatus::Running | SimulationStatus::Failed => {
                self.final_result = None;
            }
        }
    }
}

/// Participant description used when creating a simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub name: String,
    #[serde(default)]
    pub role: String,
}

impl FromStr for AgentRequest {
    type Err = String;

    /// Parses `NAME` or `NAME:ROLE`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, role) = match s.split_once(':') {
            Some((name, role)) => (name.trim(), role.trim()),
            None => (s.trim(), ""),
        };

        if name.is_empty() {
            return Err(format!("agent name must not be empty: {:?}", s));
        }

        Ok(AgentRequest {
            name: name.to_string(),
            role: role.to_string(),
        })
    }
}

/// Request body for `POST /simulations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSimulationRequest {
    pub description: String,
    pub preconditions: String,
    pub rounds: u32,
    pub show_only_result: bool,
    pub agents: Vec<AgentRequest>,
    pub language: Language,
    pub depth: Depth,
}

impl CreateSimulationRequest {
    /// Check the request against the rules the server enforces
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.description.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "description is required".to_string(),
            ));
        }

        if self.rounds < 1 || self.rounds > MAX_ROUNDS {
            return Err(ApiError::InvalidRequest(format!(
                "rounds must be between 1 and {}",
                MAX_ROUNDS
            )));
        }

        Ok(())
    }
}

/// Error body returned by the server on non-success responses
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
}

/// Error types for REST API operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request error: {0}")]
    Request(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status of the failed response, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound(_) => Some(404),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Error types for push stream operations
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("WebSocket connection error: {0}")]
    Connection(String),
    #[error("WebSocket message error: {0}")]
    Message(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_detection() {
        let step: Step =
            serde_json::from_str(r#"{"round": -1, "content": "summary"}"#).unwrap();
        assert!(step.is_sentinel());
        assert_eq!(step.agent_name, "");

        let step: Step = serde_json::from_str(
            r#"{"round": 2, "agent_id": "a1", "agent_name": "Alice", "content": "hi", "timestamp": "2025-01-02T03:04:05.123456789+03:00"}"#,
        )
        .unwrap();
        assert!(!step.is_sentinel());
        assert_eq!(step.agent_name, "Alice");
    }

    #[test]
    fn test_step_requires_round_and_content() {
        assert!(serde_json::from_str::<Step>(r#"{"content": "x"}"#).is_err());
        assert!(serde_json::from_str::<Step>(r#"{"round": 1}"#).is_err());
    }

    #[test]
    fn test_simulation_tolerates_server_defaults() {
        let json = r#"{
            "id": "sim-1",
            "description": "Negotiation",
            "preconditions": "",
            "rounds": 3,
            "show_only_result": false,
            "agents": null,
            "language": "",
            "depth": "",
            "status": "running",
            "steps": null,
            "created_at": "0001-01-01T00:00:00Z"
        }"#;

        let sim: Simulation = serde_json::from_str(json).unwrap();
        assert_eq!(sim.language, Language::En);
        assert_eq!(sim.depth, Depth::Medium);
        assert!(sim.agents.is_empty());
        assert!(sim.steps.is_empty());
        assert_eq!(sim.final_result, None);
        assert!(!sim.is_interactive());
    }

    #[test]
    fn test_final_result_omitted_when_absent() {
        let json = r#"{"id": "s", "status": "failed", "final_result": "", "created_at": "2025-01-01T00:00:00Z"}"#;
        let sim: Simulation = serde_json::from_str(json).unwrap();
        assert_eq!(sim.final_result, None);

        let value = serde_json::to_value(&sim).unwrap();
        assert!(value.get("final_result").is_none());
        assert_eq!(value["status"], "failed");
    }

    #[test]
    fn test_normalize_enforces_result_invariant() {
        let json = r#"{"id": "s", "status": "failed", "final_result": "partial", "created_at": "2025-01-01T00:00:00Z"}"#;
        let mut sim: Simulation = serde_json::from_str(json).unwrap();
        sim.normalize();
        assert_eq!(sim.final_result, None);

        sim.status = SimulationStatus::Completed;
        sim.normalize();
        assert_eq!(sim.final_result.as_deref(), Some(""));
    }

    #[test]
    fn test_agent_request_parsing() {
        let agent: AgentRequest = "Alice:buyer".parse().unwrap();
        assert_eq!(agent.name, "Alice");
        assert_eq!(agent.role, "buyer");

        let agent: AgentRequest = " Bob ".parse().unwrap();
        assert_eq!(agent.name, "Bob");
        assert_eq!(agent.role, "");

        assert!(":seller".parse::<AgentRequest>().is_err());
    }

    #[test]
    fn test_create_request_validation() {
        let mut request = CreateSimulationRequest {
            description: "Debate".to_string(),
            preconditions: String::new(),
            rounds: 3,
            show_only_result: false,
            agents: vec![],
            language: Language::Ru,
            depth: Depth::Deep,
        };
        assert!(request.validate().is_ok());

        request.rounds = 0;
        assert!(matches!(
            request.validate(),
            Err(ApiError::InvalidRequest(_))
        ));

        request.rounds = 21;
        assert!(request.validate().is_err());

        request.rounds = 20;
        request.description = "   ".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_request_serializes_lowercase_enums() {
        let request = CreateSimulationRequest {
            description: "d".to_string(),
            preconditions: "p".to_string(),
            rounds: 1,
            show_only_result: true,
            agents: vec!["A:r".parse().unwrap()],
            language: Language::Ru,
            depth: Depth::Shallow,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["language"], "ru");
        assert_eq!(value["depth"], "shallow");
        assert_eq!(value["agents"][0]["role"], "r");
    }

    #[test]
    fn test_api_error_status() {
        assert_eq!(ApiError::NotFound("gone".into()).status(), Some(404));
        let err = ApiError::Status {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "boom");
        assert_eq!(ApiError::Request("x".into()).status(), None);
    }
}
