//! Fallback policy — the deterministic safe output substituted when an
//! agent's external call fails and the top-level safety net the engine
//! applies when a run ends without a usable summary.

use sibyl_core::types::Message;

use crate::state::StateUpdate;

/// Fixed, user-facing text for runs where the assistant could not produce a
/// real answer. Deliberately friendly and non-technical.
pub const FALLBACK_SUMMARY: &str = "I'm having trouble reaching my analysis tools right now. \
Connect a data source and ask me about your data — or ask me what I can do!";

/// Terminal update carrying the fallback text as both summary and assistant
/// message. Used as the conversational node's declared fallback and as the
/// engine's last-resort safety net, so both layers present the same text.
pub fn safety_net_update() -> StateUpdate {
    StateUpdate::terminal()
        .with_summary(FALLBACK_SUMMARY)
        .with_message(Message::assistant(FALLBACK_SUMMARY))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_net_is_terminal_with_summary() {
        let update = safety_net_update();
        assert!(update.directive.is_terminal());
        assert_eq!(update.summary.as_deref(), Some(FALLBACK_SUMMARY));
        assert!(update.insights.is_empty());
        assert_eq!(update.messages.len(), 1);
    }
}
