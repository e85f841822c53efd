//! Textual classification of captured tool output.
//!
//! Exit codes are not trusted on their own: several of the wrapped tools
//! report "nothing found" on stderr with status 0, or exit non-zero while
//! printing perfectly good results.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analyzer::tool_management::ModuleKey;
use crate::common::command_utils::{is_exec_format_error, RawExecutionOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    Success,
    NotFound,
    LibraryMissing { library: Option<String> },
    ToolError { message: String },
}

impl Classification {
    pub fn is_success(&self) -> bool {
        matches!(self, Classification::Success)
    }

    /// Absent or unloadable: both call for install advice.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Classification::NotFound | Classification::LibraryMissing { .. }
        )
    }
}

static SHARED_LIBRARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"error while loading shared libraries: ([^:\s]+)").expect("valid regex")
});

static SHARED_OBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([^\s:]+): cannot open shared object file").expect("valid regex")
});

static DYLD_LIBRARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"dyld(?:\[\d+\])?: Library not loaded: (\S+)").expect("valid regex")
});

static INCOMPATIBLE_BINARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)exec format error|cannot execute binary file").expect("valid regex")
});

static COMMAND_NOT_FOUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)command not found|^\S+: (?:\d+: )?\S+: not found\s*$").expect("valid regex")
});

const PYTHON_TRACEBACK: &str = "Traceback (most recent call last)";

pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Tool-agnostic classification of combined output.
    pub fn classify(output: &str) -> Classification {
        if let Some(library) = Self::missing_library(output) {
            return Classification::LibraryMissing { library };
        }
        if COMMAND_NOT_FOUND.is_match(output) {
            return Classification::NotFound;
        }
        Classification::Success
    }

    /// Classify a finished run of `module`, layering the tool's own error
    /// conventions over the generic patterns.
    pub fn classify_module(module: ModuleKey, outcome: &RawExecutionOutcome) -> Classification {
        let generic = Self::classify(&outcome.combined_output);
        if !generic.is_success() {
            return generic;
        }

        if let Some(line) = Self::tool_error_line(module, &outcome.combined_output) {
            return Classification::ToolError { message: line };
        }

        if outcome.timed_out {
            let limit = outcome.duration.as_secs().max(1);
            return Classification::ToolError {
                message: format!("timed out after {}s", limit),
            };
        }

        Classification::Success
    }

    /// Classify a failure to start the process at all.
    pub fn classify_spawn_error(err: &std::io::Error) -> Classification {
        if err.kind() == std::io::ErrorKind::NotFound {
            return Classification::NotFound;
        }
        if is_exec_format_error(err) {
            return Classification::LibraryMissing { library: None };
        }
        Classification::ToolError {
            message: format!("failed to start: {}", err),
        }
    }

    /// `Some(name)` when a loader failure is present; the inner option is the
    /// shared object's name when the loader reported one.
    fn missing_library(output: &str) -> Option<Option<String>> {
        for pattern in [&*SHARED_LIBRARY, &*DYLD_LIBRARY, &*SHARED_OBJECT] {
            if let Some(caps) = pattern.captures(output) {
                return Some(caps.get(1).map(|m| m.as_str().to_string()));
            }
        }
        if output.contains("error while loading shared libraries")
            || output.contains("cannot open shared object file")
            || INCOMPATIBLE_BINARY.is_match(output)
        {
            return Some(None);
        }
        None
    }

    fn tool_error_line(module: ModuleKey, output: &str) -> Option<String> {
        let markers = error_markers(module);
        output
            .lines()
            .map(str::trim)
            .find(|line| markers.iter().any(|marker| marker.matches(line)))
            .map(|line| line.to_string())
    }
}

enum Marker {
    Prefix(&'static str),
    Contains(&'static str),
}

impl Marker {
    fn matches(&self, line: &str) -> bool {
        match self {
            Marker::Prefix(p) => line.starts_with(p),
            Marker::Contains(c) => line.contains(c),
        }
    }
}

fn error_markers(module: ModuleKey) -> &'static [Marker] {
    match module {
        ModuleKey::Stegoveritas => &[Marker::Contains(PYTHON_TRACEBACK)],
        ModuleKey::Foremost => &[Marker::Prefix("ERROR:"), Marker::Prefix("foremost: ")],
        ModuleKey::SteghideInfo | ModuleKey::SteghideExtract => &[Marker::Prefix("steghide: ")],
        ModuleKey::Outguess => &[
            Marker::Prefix("outguess: "),
            Marker::Prefix("Unknown data type"),
            Marker::Prefix("Can not "),
        ],
        ModuleKey::Strings => &[Marker::Prefix("strings: ")],
        ModuleKey::Exiv2 => &[Marker::Contains("Exiv2 exception"), Marker::Prefix("Error: ")],
        ModuleKey::Exif => &[Marker::Prefix("Error: ")],
        ModuleKey::Binwalk => &[
            Marker::Contains(PYTHON_TRACEBACK),
            Marker::Prefix("General Error:"),
        ],
        ModuleKey::Xxd => &[Marker::Prefix("xxd: ")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn outcome(text: &str) -> RawExecutionOutcome {
        RawExecutionOutcome {
            combined_output: text.to_string(),
            exit_code: Some(0),
            timed_out: false,
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn names_the_missing_shared_object() {
        let out = "steghide: error while loading shared libraries: libmhash.so.2: cannot open shared object file: No such file or directory";
        assert_eq!(
            ErrorClassifier::classify(out),
            Classification::LibraryMissing {
                library: Some("libmhash.so.2".to_string())
            }
        );
    }

    #[test]
    fn dyld_failures_are_library_problems() {
        let out = "dyld[4242]: Library not loaded: /opt/homebrew/opt/jpeg/lib/libjpeg.8.dylib";
        assert!(matches!(
            ErrorClassifier::classify(out),
            Classification::LibraryMissing { library: Some(lib) } if lib.ends_with("libjpeg.8.dylib")
        ));
    }

    #[test]
    fn shell_not_found_patterns() {
        assert_eq!(ErrorClassifier::classify("bash: binwalk: command not found"), Classification::NotFound);
        assert_eq!(ErrorClassifier::classify("sh: 1: outguess: not found\n"), Classification::NotFound);
    }

    #[test]
    fn ordinary_not_found_text_is_data() {
        // exiv2 and friends print this as a normal "nothing here" result.
        let out = "image.jpg: No Exif data found in the file\n";
        assert_eq!(ErrorClassifier::classify_module(ModuleKey::Exiv2, &outcome(out)), Classification::Success);
        assert_eq!(
            ErrorClassifier::classify("signature not found in header"),
            Classification::Success
        );
    }

    #[test]
    fn steghide_diagnostics_are_tool_errors() {
        let out = "steghide: could not extract any data with that passphrase!\n";
        assert_eq!(
            ErrorClassifier::classify_module(ModuleKey::SteghideExtract, &outcome(out)),
            Classification::ToolError {
                message: "steghide: could not extract any data with that passphrase!".to_string()
            }
        );
    }

    #[test]
    fn markers_are_module_specific() {
        let out = "Error: File format error\n";
        assert!(matches!(
            ErrorClassifier::classify_module(ModuleKey::Exif, &outcome(out)),
            Classification::ToolError { .. }
        ));
        // The same line inside `strings` output is just a string from the file.
        assert_eq!(
            ErrorClassifier::classify_module(ModuleKey::Strings, &outcome(out)),
            Classification::Success
        );
    }

    #[test]
    fn timeouts_are_tool_errors() {
        let mut raw = outcome("partial\n");
        raw.timed_out = true;
        raw.duration = Duration::from_secs(3);
        assert_eq!(
            ErrorClassifier::classify_module(ModuleKey::Stegoveritas, &raw),
            Classification::ToolError {
                message: "timed out after 3s".to_string()
            }
        );
    }

    #[test]
    fn empty_output_is_success() {
        assert_eq!(ErrorClassifier::classify(""), Classification::Success);
    }

    #[test]
    fn spawn_errors() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(ErrorClassifier::classify_spawn_error(&missing), Classification::NotFound);

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            ErrorClassifier::classify_spawn_error(&denied),
            Classification::ToolError { .. }
        ));
    }

    proptest! {
        #[test]
        fn loader_failures_always_win(prefix in ".{0,80}", suffix in ".{0,80}", idx in 0usize..10) {
            let text = format!("{}error while loading shared libraries{}", prefix, suffix);
            prop_assert!(matches!(
                ErrorClassifier::classify(&text),
                Classification::LibraryMissing { .. }
            ), "expected LibraryMissing from classify");
            let module = ModuleKey::ALL[idx];
            prop_assert!(matches!(
                ErrorClassifier::classify_module(module, &outcome(&text)),
                Classification::LibraryMissing { .. }
            ), "expected LibraryMissing from classify_module");
        }
    }
}
