//! Delivery result types.
//!
//! An [`ExecutionResult`] is what the caller appends to its transaction
//! record: one [`CommandResult`] per distinct command text plus an overall
//! success flag.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Command text of the synthetic entry added when no product had commands.
pub const NO_COMMANDS_MARKER: &str = "<NO_RCON_COMMANDS_FOUND>";

/// Command text of the synthetic entry added when the command store failed.
pub const COMMAND_LOOKUP_MARKER: &str = "<RCON_COMMAND_LOOKUP_FAILED>";

/// Command text of the synthetic entry added when the server registry failed.
pub const SERVER_LOOKUP_MARKER: &str = "<RCON_SERVER_LOOKUP_FAILED>";

/// A single send of one command to one server. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAttempt {
    /// Command text after `%player%` substitution.
    pub command_text: String,

    /// Server the command was sent to.
    pub server_name: String,

    /// 1-based attempt counter.
    pub attempt_number: u32,

    /// Body returned by the server, if the exchange completed.
    pub raw_response: Option<String>,

    /// Whether the acceptance heuristic matched.
    pub succeeded: bool,

    /// Send failure, if the exchange did not complete.
    pub error: Option<String>,
}

impl DeliveryAttempt {
    /// An attempt whose exchange completed.
    pub fn answered(
        command_text: impl Into<String>,
        server_name: impl Into<String>,
        attempt_number: u32,
        response: impl Into<String>,
        accepted: bool,
    ) -> Self {
        Self {
            command_text: command_text.into(),
            server_name: server_name.into(),
            attempt_number,
            raw_response: Some(response.into()),
            succeeded: accepted,
            error: None,
        }
    }

    /// An attempt whose exchange failed.
    pub fn failed(
        command_text: impl Into<String>,
        server_name: impl Into<String>,
        attempt_number: u32,
        error: impl Into<String>,
    ) -> Self {
        Self {
            command_text: command_text.into(),
            server_name: server_name.into(),
            attempt_number,
            raw_response: None,
            succeeded: false,
            error: Some(error.into()),
        }
    }

    /// One-line trace entry.
    pub fn describe(&self) -> String {
        let outcome = match (&self.error, self.succeeded) {
            (Some(error), _) => format!("error: {}", error),
            (None, true) => "accepted".to_string(),
            (None, false) => "not accepted".to_string(),
        };
        match &self.raw_response {
            Some(response) => format!(
                "[{}] attempt {}: {}; response: {:?}",
                self.server_name, self.attempt_number, outcome, response
            ),
            None => format!("[{}] attempt {}: {}", self.server_name, self.attempt_number, outcome),
        }
    }
}

/// Merged outcome for one distinct command text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub command_text: String,

    /// True once any attempt on any server was accepted.
    pub succeeded: bool,

    /// First accepted response, followed by later non-empty responses.
    pub response: Option<String>,

    /// Why the command is believed to have failed.
    pub error_message: Option<String>,

    /// One entry per attempt / server event, in order.
    #[serde(default)]
    pub debug: Vec<String>,
}

impl CommandResult {
    /// Create an empty, not-yet-succeeded result.
    pub fn new(command_text: impl Into<String>) -> Self {
        Self {
            command_text: command_text.into(),
            succeeded: false,
            response: None,
            error_message: None,
            debug: Vec::new(),
        }
    }

    /// Synthetic failure entry.
    pub fn synthetic_failure(marker: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            command_text: marker.to_string(),
            succeeded: false,
            response: None,
            error_message: Some(message.clone()),
            debug: vec![message],
        }
    }

    /// Fold one attempt into this result.
    pub fn absorb(&mut self, attempt: &DeliveryAttempt) {
        self.debug.push(attempt.describe());

        let response = attempt.raw_response.as_deref().filter(|r| !r.is_empty());

        if attempt.succeeded && !self.succeeded {
            self.succeeded = true;
            self.response = response.map(str::to_string);
            self.error_message = None;
            return;
        }

        if self.succeeded {
            if let Some(response) = response {
                self.append_response(response);
            }
            return;
        }

        if let Some(response) = response {
            self.response = Some(response.to_string());
        }
        if let Some(error) = &attempt.error {
            self.error_message = Some(error.clone());
        }
    }

    /// Record that a server never got to see this command.
    pub fn record_unreachable(&mut self, server_name: &str, error: &str) {
        self.debug.push(format!("[{}] not sent: {}", server_name, error));
        if !self.succeeded {
            self.error_message = Some(error.to_string());
        }
    }

    /// Record that the retry budget ran out on a server.
    pub fn record_exhausted(&mut self, server_name: &str, attempts: u32, last_error: Option<&str>) {
        self.debug.push(format!(
            "[{}] gave up after {} attempt(s)",
            server_name, attempts
        ));
        if !self.succeeded {
            self.error_message = Some(match last_error {
                Some(error) => error.to_string(),
                None => format!(
                    "Command was not accepted by server {} after {} attempt(s)",
                    server_name, attempts
                ),
            });
        }
    }

    fn append_response(&mut self, response: &str) {
        match &mut self.response {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(response);
            }
            None => self.response = Some(response.to_string()),
        }
    }
}

/// Terminal output of one delivery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub all_succeeded: bool,
    pub command_results: Vec<CommandResult>,
}

impl ExecutionResult {
    /// Nothing was requested, so nothing failed.
    pub fn trivial_success() -> Self {
        Self {
            all_succeeded: true,
            command_results: Vec::new(),
        }
    }

    /// A run that failed before any command could be attempted.
    pub fn run_failure(marker: &str, message: impl Into<String>) -> Self {
        Self {
            all_succeeded: false,
            command_results: vec![CommandResult::synthetic_failure(marker, message)],
        }
    }

    /// Results that need manual follow-up.
    pub fn failed_commands(&self) -> Vec<&CommandResult> {
        self.command_results.iter().filter(|r| !r.succeeded).collect()
    }

    /// Look up the merged result for one command text.
    pub fn get(&self, command_text: &str) -> Option<&CommandResult> {
        self.command_results
            .iter()
            .find(|r| r.command_text == command_text)
    }

    /// Serialize for the caller's audit record.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// SHA-256 hex digest of the JSON form, stored next to audit records.
    pub fn digest(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}
