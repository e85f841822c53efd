use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// An external analysis program, keyed independently of how it is displayed
/// and of the module keys it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolIdentity {
    Stegoveritas,
    Foremost,
    Steghide,
    Outguess,
    Strings,
    Exiv2,
    Exiftool,
    Binwalk,
    Xxd,
}

impl ToolIdentity {
    pub const ALL: [ToolIdentity; 9] = [
        ToolIdentity::Stegoveritas,
        ToolIdentity::Foremost,
        ToolIdentity::Steghide,
        ToolIdentity::Outguess,
        ToolIdentity::Strings,
        ToolIdentity::Exiv2,
        ToolIdentity::Exiftool,
        ToolIdentity::Binwalk,
        ToolIdentity::Xxd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolIdentity::Stegoveritas => "stegoveritas",
            ToolIdentity::Foremost => "foremost",
            ToolIdentity::Steghide => "steghide",
            ToolIdentity::Outguess => "outguess",
            ToolIdentity::Strings => "strings",
            ToolIdentity::Exiv2 => "exiv2",
            ToolIdentity::Exiftool => "exiftool",
            ToolIdentity::Binwalk => "binwalk",
            ToolIdentity::Xxd => "xxd",
        }
    }

    /// Executable name looked up on the search path and in the fallback dir.
    pub fn base_command(&self) -> &'static str {
        self.as_str()
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            ToolIdentity::Stegoveritas => "Stegoveritas (Deep Analysis)",
            ToolIdentity::Foremost => "Foremost (File Extraction)",
            ToolIdentity::Steghide => "Steghide Analysis",
            ToolIdentity::Outguess => "Outguess",
            ToolIdentity::Strings => "Strings (Text Extraction)",
            ToolIdentity::Exiv2 => "Exiv2 Metadata",
            ToolIdentity::Exiftool => "ExifTool Metadata",
            ToolIdentity::Binwalk => "Binwalk Signature Scan",
            ToolIdentity::Xxd => "Hex Dump (xxd)",
        }
    }

    /// Low-risk self-test arguments used by the availability probe. None of
    /// them touch the analysis target.
    pub fn probe_args(&self) -> &'static [&'static str] {
        match self {
            ToolIdentity::Stegoveritas => &["-h"],
            ToolIdentity::Foremost => &["-V"],
            ToolIdentity::Steghide => &["--version"],
            ToolIdentity::Outguess => &["-h"],
            ToolIdentity::Strings => &["--version"],
            ToolIdentity::Exiv2 => &["--version"],
            ToolIdentity::Exiftool => &["-ver"],
            ToolIdentity::Binwalk => &["--help"],
            ToolIdentity::Xxd => &["-v"],
        }
    }

    /// Module keys this tool feeds, in run order.
    pub fn modules(&self) -> Vec<ModuleKey> {
        ModuleKey::ALL
            .iter()
            .copied()
            .filter(|module| module.tool() == *self)
            .collect()
    }
}

impl fmt::Display for ToolIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolIdentity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        if let Some(tool) = ToolIdentity::ALL
            .iter()
            .find(|tool| tool.as_str().eq_ignore_ascii_case(needle))
        {
            return Ok(*tool);
        }
        // Module keys double as tool names in selections ("exif", "steghideE").
        needle
            .parse::<ModuleKey>()
            .map(|module| module.tool())
            .map_err(|_| ConfigError::UnknownTool(needle.to_string()))
    }
}

/// One analysis output stream. A tool may produce several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModuleKey {
    #[serde(rename = "stegoveritas")]
    Stegoveritas,
    #[serde(rename = "foremost")]
    Foremost,
    #[serde(rename = "steghideInfo")]
    SteghideInfo,
    #[serde(rename = "steghideE")]
    SteghideExtract,
    #[serde(rename = "outguess")]
    Outguess,
    #[serde(rename = "strings")]
    Strings,
    #[serde(rename = "exiv2")]
    Exiv2,
    #[serde(rename = "exif")]
    Exif,
    #[serde(rename = "binwalk")]
    Binwalk,
    #[serde(rename = "xxd")]
    Xxd,
}

impl ModuleKey {
    /// Run order.
    pub const ALL: [ModuleKey; 10] = [
        ModuleKey::Stegoveritas,
        ModuleKey::Foremost,
        ModuleKey::SteghideInfo,
        ModuleKey::SteghideExtract,
        ModuleKey::Outguess,
        ModuleKey::Strings,
        ModuleKey::Exiv2,
        ModuleKey::Exif,
        ModuleKey::Binwalk,
        ModuleKey::Xxd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKey::Stegoveritas => "stegoveritas",
            ModuleKey::Foremost => "foremost",
            ModuleKey::SteghideInfo => "steghideInfo",
            ModuleKey::SteghideExtract => "steghideE",
            ModuleKey::Outguess => "outguess",
            ModuleKey::Strings => "strings",
            ModuleKey::Exiv2 => "exiv2",
            ModuleKey::Exif => "exif",
            ModuleKey::Binwalk => "binwalk",
            ModuleKey::Xxd => "xxd",
        }
    }

    /// The single tool responsible for this module, used for install advice.
    pub fn tool(&self) -> ToolIdentity {
        match self {
            ModuleKey::Stegoveritas => ToolIdentity::Stegoveritas,
            ModuleKey::Foremost => ToolIdentity::Foremost,
            ModuleKey::SteghideInfo | ModuleKey::SteghideExtract => ToolIdentity::Steghide,
            ModuleKey::Outguess => ToolIdentity::Outguess,
            ModuleKey::Strings => ToolIdentity::Strings,
            ModuleKey::Exiv2 => ToolIdentity::Exiv2,
            ModuleKey::Exif => ToolIdentity::Exiftool,
            ModuleKey::Binwalk => ToolIdentity::Binwalk,
            ModuleKey::Xxd => ToolIdentity::Xxd,
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            ModuleKey::Stegoveritas => "Stegoveritas",
            ModuleKey::Foremost => "Foremost",
            ModuleKey::SteghideInfo => "Steghide Info",
            ModuleKey::SteghideExtract => "Steghide Extraction",
            ModuleKey::Outguess => "Outguess",
            ModuleKey::Strings => "Strings",
            ModuleKey::Exiv2 => "Exiv2",
            ModuleKey::Exif => "Exif",
            ModuleKey::Binwalk => "Binwalk",
            ModuleKey::Xxd => "Xxd",
        }
    }

    /// Modules whose raw output is long enough to be collapsed when rendered.
    pub fn is_bulky(&self) -> bool {
        matches!(self, ModuleKey::Strings | ModuleKey::Xxd)
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ModuleKey::ALL
            .iter()
            .find(|module| module.as_str().eq_ignore_ascii_case(needle))
            .copied()
            .ok_or_else(|| ConfigError::UnknownTool(needle.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_module_maps_to_exactly_one_tool() {
        for tool in ToolIdentity::ALL {
            for module in tool.modules() {
                assert_eq!(module.tool(), tool);
            }
        }
        let covered: usize = ToolIdentity::ALL.iter().map(|t| t.modules().len()).sum();
        assert_eq!(covered, ModuleKey::ALL.len());
    }

    #[test]
    fn steghide_produces_info_and_extraction() {
        assert_eq!(
            ToolIdentity::Steghide.modules(),
            vec![ModuleKey::SteghideInfo, ModuleKey::SteghideExtract]
        );
    }

    #[test]
    fn legacy_module_names_resolve_to_tools() {
        assert_eq!("exif".parse::<ToolIdentity>().unwrap(), ToolIdentity::Exiftool);
        assert_eq!("steghideE".parse::<ToolIdentity>().unwrap(), ToolIdentity::Steghide);
        assert_eq!("BINWALK".parse::<ToolIdentity>().unwrap(), ToolIdentity::Binwalk);
        assert!("nmap".parse::<ToolIdentity>().is_err());
    }

    #[test]
    fn module_keys_serialize_with_legacy_names() {
        let json = serde_json::to_string(&ModuleKey::SteghideExtract).unwrap();
        assert_eq!(json, "\"steghideE\"");
        let json = serde_json::to_string(&ToolIdentity::Exiftool).unwrap();
        assert_eq!(json, "\"exiftool\"");
    }
}
