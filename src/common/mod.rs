pub mod command_utils;
pub mod format;

pub use command_utils::{CommandRunner, CommandSpec, RawExecutionOutcome};
pub use format::format_bytes;
