// Handler modules
pub mod analyze;
pub mod cleanup;
pub mod tools;
pub mod utils;

// Re-export all handler functions
pub use analyze::{handle_analyze, AnalyzeOptions};
pub use cleanup::handle_cleanup;
pub use tools::handle_tools;
pub use utils::{format_bytes, parse_tools};
