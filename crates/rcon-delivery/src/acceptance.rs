//! Deciding whether a server carried out a command.
//!
//! RCON has no structured acknowledgement, so acceptance is inferred from
//! the free-text reply.

/// Reply fragments treated as success by the default policy.
pub const DEFAULT_ACCEPTANCE_KEYWORDS: &[&str] =
    &["given", "gave", "added", "ok", "success", "granted", "received"];

/// Policy deciding whether a reply means the command was carried out.
pub trait AcceptancePolicy: Send + Sync {
    /// `command` is the text after `%player%` substitution; `player` is the
    /// sanitized purchaser name (possibly empty).
    fn is_accepted(&self, command: &str, player: &str, response: &str) -> bool;
}

impl<F> AcceptancePolicy for F
where
    F: Fn(&str, &str, &str) -> bool + Send + Sync,
{
    fn is_accepted(&self, command: &str, player: &str, response: &str) -> bool {
        self(command, player, response)
    }
}

/// Default policy: echoed command, echoed command minus the player name, or
/// a success keyword.
#[derive(Debug, Clone)]
pub struct KeywordAcceptance {
    keywords: Vec<String>,
}

impl Default for KeywordAcceptance {
    fn default() -> Self {
        Self::with_keywords(DEFAULT_ACCEPTANCE_KEYWORDS.iter().copied())
    }
}

impl KeywordAcceptance {
    /// Policy with a custom keyword list.
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }
}

impl AcceptancePolicy for KeywordAcceptance {
    fn is_accepted(&self, command: &str, player: &str, response: &str) -> bool {
        let response = response.to_lowercase();
        let command = command.trim().to_lowercase();

        if !command.is_empty() && response.contains(&command) {
            return true;
        }

        let player = player.to_lowercase();
        if !player.is_empty() {
            let without_player = collapse_whitespace(&command.replace(&player, " "));
            if !without_player.is_empty() && collapse_whitespace(&response).contains(&without_player) {
                return true;
            }
        }

        self.keywords.iter().any(|k| response.contains(k.as_str()))
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
