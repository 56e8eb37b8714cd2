//! Process exit codes. Part of the public contract of the `evalviz` binary.

use evalviz_client::ClientError;
use evalviz_core::EvalError;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_LOOKUP_FAILED: i32 = 1; // record not found, query or collaborator failure
pub const EXIT_CONFIG_ERROR: i32 = 2; // config, usage or internal error

/// Exit code for an error that escaped a command.
pub fn classify(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<ClientError>() {
        return e.exit_code();
    }
    if let Some(e) = err.downcast_ref::<EvalError>() {
        return if e.is_config() {
            EXIT_CONFIG_ERROR
        } else {
            EXIT_LOOKUP_FAILED
        };
    }
    EXIT_CONFIG_ERROR
}
