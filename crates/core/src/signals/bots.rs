//! Bot account detection
//!
//! Automation accounts would otherwise dominate the contributor signals.
//! Detection is a pluggable predicate over the login; the default covers
//! the common host conventions.

/// Predicate deciding whether a login belongs to an automation account.
pub trait BotPolicy: Send + Sync {
    fn is_bot(&self, login: &str) -> bool;
}

/// Login-pattern policy: a case-insensitive `[bot]` suffix or the exact
/// `github-actions` login. An empty login is treated as a bot so malformed
/// attribution never inflates human counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginBotPolicy;

impl BotPolicy for LoginBotPolicy {
    fn is_bot(&self, login: &str) -> bool {
        if login.is_empty() {
            return true;
        }
        let lowered = login.to_ascii_lowercase();
        lowered.ends_with("[bot]") || lowered == "github-actions"
    }
}
