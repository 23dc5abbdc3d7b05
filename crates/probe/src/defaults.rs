pub(crate) const DEFAULT_ENDPOINT: &str = "ws://localhost:9000";

/// How long the idle loop waits for the next message before giving up.
pub(crate) const DEFAULT_IDLE_TIMEOUT_MS: u64 = 1_000;

pub(crate) const DEFAULT_LOG_DIRECTIVES: &str = "crdt_probe=info";
