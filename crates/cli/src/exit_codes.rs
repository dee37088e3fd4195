//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Domain    | Description                                   |
//! |------|-----------|-----------------------------------------------|
//! | 0    | Universal | Success                                       |
//! | 1    | Universal | General error (unspecified)                   |
//! | 2    | Universal | CLI usage error (bad args)                    |
//! | 3    | resolve   | Config failed to parse or validate            |
//! | 4    | resolve   | Runtime failure (I/O, malformed input tables) |
//! | 5    | resolve   | Cluster anomaly under `--strict`              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use shopkeep_identity::IdentityError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
#[allow(dead_code)] // reserved
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse failures.
#[allow(dead_code)] // emitted by clap, not by our code
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Resolve (3-5)
// =============================================================================

/// Config file parsed but is invalid, or is not valid TOML.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Runtime error: unreadable file, missing column, malformed CSV/JSON,
/// unwritable output.
pub const EXIT_RUNTIME: u8 = 4;

/// `--strict` run produced a cluster larger than `--max-cluster`, or a
/// cluster glued together by a missing phone or email.
pub const EXIT_CLUSTER_ANOMALY: u8 = 5;

/// Map an engine error onto its exit code.
pub fn identity_exit_code(err: &IdentityError) -> u8 {
    match err {
        IdentityError::ConfigParse(_) | IdentityError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        IdentityError::MissingColumn { .. }
        | IdentityError::Csv { .. }
        | IdentityError::Json { .. }
        | IdentityError::QuantityParse { .. }
        | IdentityError::Io(_) => EXIT_RUNTIME,
    }
}
