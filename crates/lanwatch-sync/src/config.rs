//! Hub configuration.

use serde::Deserialize;

/// `[hub]` configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Events retained for replay and the recent-events endpoint.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Events replayed to a subscriber when it joins.
    #[serde(default = "default_replay_limit")]
    pub replay_limit: usize,
}

fn default_history_capacity() -> usize {
    100
}

fn default_replay_limit() -> usize {
    10
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            replay_limit: default_replay_limit(),
        }
    }
}
