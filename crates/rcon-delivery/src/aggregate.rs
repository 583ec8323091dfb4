//! Folding delivery events into an [`ExecutionResult`].

use std::collections::HashMap;

use rcon_core::result::NO_COMMANDS_MARKER;
use rcon_core::{CommandResult, DeliveryAttempt, ExecutionResult, Product};

/// Something that happened while delivering one command to one server.
///
/// Target workers emit these; a single [`ResultAccumulator`] consumes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryEvent {
    /// One send of the command.
    Attempt(DeliveryAttempt),

    /// The command never reached the server.
    Unreachable {
        command_text: String,
        server_name: String,
        error: String,
    },

    /// Retry budget spent without acceptance.
    Exhausted {
        command_text: String,
        server_name: String,
        attempts: u32,
        last_error: Option<String>,
    },
}

impl DeliveryEvent {
    /// Command text this event belongs to.
    pub fn command_text(&self) -> &str {
        match self {
            DeliveryEvent::Attempt(attempt) => &attempt.command_text,
            DeliveryEvent::Unreachable { command_text, .. } => command_text,
            DeliveryEvent::Exhausted { command_text, .. } => command_text,
        }
    }
}

/// Results of one run, keyed by exact command text in first-seen order.
#[derive(Debug, Default)]
pub struct ResultAccumulator {
    results: Vec<CommandResult>,
    index: HashMap<String, usize>,
    lines_seen: usize,
    lines_with_commands: usize,
    products_without_commands: Vec<String>,
}

impl ResultAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a purchase line that resolved to at least one command.
    pub fn note_line_with_commands(&mut self) {
        self.lines_seen += 1;
        self.lines_with_commands += 1;
    }

    /// Note a purchase line whose product has no commands.
    pub fn note_line_without_commands(&mut self, product: &Product) {
        self.lines_seen += 1;
        self.products_without_commands.push(product.label());
    }

    /// Fold one event in.
    pub fn apply(&mut self, event: DeliveryEvent) {
        let result = self.entry(event.command_text());
        match event {
            DeliveryEvent::Attempt(attempt) => result.absorb(&attempt),
            DeliveryEvent::Unreachable {
                server_name, error, ..
            } => result.record_unreachable(&server_name, &error),
            DeliveryEvent::Exhausted {
                server_name,
                attempts,
                last_error,
                ..
            } => result.record_exhausted(&server_name, attempts, last_error.as_deref()),
        }
    }

    /// Fold a batch of events in, preserving their order.
    pub fn apply_all(&mut self, events: impl IntoIterator<Item = DeliveryEvent>) {
        for event in events {
            self.apply(event);
        }
    }

    /// Produce the final result.
    ///
    /// Lines that all lack commands make the run fail with an explanatory
    /// entry, so callers never mistake "nothing ran" for success.
    pub fn finish(self) -> ExecutionResult {
        if self.lines_seen == 0 {
            return ExecutionResult::trivial_success();
        }

        if self.lines_with_commands == 0 {
            let mut entry = CommandResult::synthetic_failure(
                NO_COMMANDS_MARKER,
                "No RCON commands are configured for any purchased product",
            );
            entry.debug.extend(
                self.products_without_commands
                    .iter()
                    .map(|p| format!("no commands defined for product {}", p)),
            );
            return ExecutionResult {
                all_succeeded: false,
                command_results: vec![entry],
            };
        }

        ExecutionResult {
            all_succeeded: self.results.iter().all(|r| r.succeeded),
            command_results: self.results,
        }
    }

    fn entry(&mut self, command_text: &str) -> &mut CommandResult {
        let idx = match self.index.get(command_text) {
            Some(idx) => *idx,
            None => {
                self.results.push(CommandResult::new(command_text));
                self.index.insert(command_text.to_string(), self.results.len() - 1);
                self.results.len() - 1
            }
        };
        &mut self.results[idx]
    }
}
