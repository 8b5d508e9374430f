//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Agent loop constants
pub mod agent {
    /// Iteration ceiling for one `Agent::execute` call
    pub const MAX_ITERATIONS: usize = 500;

    /// Synthetic user turn pushed when the continuation oracle votes to
    /// keep the agent speaking
    pub const CONTINUE_PROMPT: &str = "Please continue.";

    /// Maximum directory entries included in the environment preamble
    pub const MAX_ENV_LISTING_ENTRIES: usize = 50;
}

/// Structured-output extraction constants
pub mod extraction {
    /// Maximum reprompt attempts after the initial extraction fails
    pub const MAX_REPROMPTS: usize = 2;

    /// Characters of the offending reply echoed back in error messages
    pub const ERROR_PREVIEW_CHARS: usize = 200;
}

/// Pipeline constants
pub mod pipeline {
    /// Concurrency cap for the Stage-4 document-writing fan-out
    pub const WRITER_CONCURRENCY: usize = 4;

    /// TTL for a cached successful analysis result (6 hours)
    pub const RESULT_TTL_SECS: u64 = 6 * 3600;

    /// Progress checkpoints per stage (user-facing heartbeat only)
    pub mod checkpoint {
        pub const STARTED: u8 = 10;
        pub const OVERVIEW: u8 = 30;
        pub const DEPENDENCIES: u8 = 40;
        pub const CORE_FEATURES: u8 = 50;
        pub const PLANNING: u8 = 60;
        pub const SCHEDULING: u8 = 70;
        pub const WRITING: u8 = 80;
        pub const PUBLISHED: u8 = 100;
    }
}

/// Session lifecycle constants
pub mod session {
    /// Maximum concurrent sessions; the oldest is evicted beyond this
    pub const MAX_SESSIONS: usize = 50;

    /// Inactivity timeout after which a session is garbage-collected
    pub const IDLE_TIMEOUT_SECS: u64 = 24 * 3600;
}

/// Progress store constants
pub mod progress {
    /// TTL for an externally-polled progress record
    pub const RECORD_TTL_SECS: u64 = 24 * 3600;
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
}
