//! Client configuration.

use tracing::warn;
use wizard_transport::ReconnectPolicy;

/// Settings for one [`WizardClient`](crate::WizardClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// WebSocket URL of the game server.
    pub endpoint: String,

    /// How the link retries after losing the server.
    pub policy: ReconnectPolicy,

    /// Capacity of the transport event and notice channels.
    pub event_capacity: usize,

    /// Send `join` again with the stored name after every reconnect.
    ///
    /// Off by default: the server may still hold the old seat, and a
    /// second join would then be refused.
    pub rejoin_on_reconnect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            policy: ReconnectPolicy::default(),
            event_capacity: 64,
            rejoin_on_reconnect: false,
        }
    }
}

impl ClientConfig {
    /// Where the game server listens unless told otherwise.
    pub const DEFAULT_ENDPOINT: &'static str = "ws://127.0.0.1:6791/";

    /// Largest accepted channel capacity.
    pub const MAX_EVENT_CAPACITY: usize = 4096;

    /// Sets the server URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_rejoin_on_reconnect(mut self, enabled: bool) -> Self {
        self.rejoin_on_reconnect = enabled;
        self
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`WizardClient::start`](crate::WizardClient::start).
    /// Rules:
    /// - a blank `endpoint` falls back to [`Self::DEFAULT_ENDPOINT`].
    /// - `event_capacity` clamped to `1..=MAX_EVENT_CAPACITY`.
    /// - `policy` goes through [`ReconnectPolicy::validated`].
    pub fn validated(mut self) -> Self {
        let trimmed = self.endpoint.trim();
        if trimmed.is_empty() {
            warn!(
                default = Self::DEFAULT_ENDPOINT,
                "empty endpoint, using default"
            );
            self.endpoint = Self::DEFAULT_ENDPOINT.to_string();
        } else if trimmed.len() != self.endpoint.len() {
            self.endpoint = trimmed.to_string();
        }

        if !(1..=Self::MAX_EVENT_CAPACITY).contains(&self.event_capacity) {
            warn!(
                capacity = self.event_capacity,
                max = Self::MAX_EVENT_CAPACITY,
                "event_capacity out of range, clamping"
            );
            self.event_capacity =
                self.event_capacity.clamp(1, Self::MAX_EVENT_CAPACITY);
        }

        self.policy = self.policy.validated();
        self
    }
}
