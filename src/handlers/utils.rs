use crate::analyzer::tool_management::ToolIdentity;
use crate::error::Result;

pub use crate::common::format_bytes;

/// Parse `--tools` values. `None` and an empty list both mean "no filter".
/// Module names such as `steghideInfo` or `exif` are accepted and mapped to
/// their tool.
pub fn parse_tools(names: Option<Vec<String>>) -> Result<Vec<ToolIdentity>> {
    let mut tools = Vec::new();
    for name in names.unwrap_or_default() {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let tool: ToolIdentity = name.parse()?;
        if !tools.contains(&tool) {
            tools.push(tool);
        }
    }
    Ok(tools)
}

/// First `max_lines` lines of `text`, with a note about what was cut.
pub fn preview(text: &str, max_lines: usize) -> String {
    let total = text.lines().count();
    if total <= max_lines {
        return text.trim_end().to_string();
    }
    let head: Vec<&str> = text.lines().take(max_lines).collect();
    format!("{}\n... ({} more lines, use --format json for everything)", head.join("\n"), total - max_lines)
}

pub fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|l| format!("{}{}", prefix, l))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, StegoError};

    #[test]
    fn parses_tool_and_module_names() {
        let tools = parse_tools(Some(vec![
            "steghide".into(),
            "steghideE".into(),
            " exif ".into(),
            "".into(),
        ]))
        .unwrap();
        assert_eq!(tools, vec![ToolIdentity::Steghide, ToolIdentity::Exiftool]);
        assert!(parse_tools(None).unwrap().is_empty());
    }

    #[test]
    fn unknown_tools_are_rejected() {
        let err = parse_tools(Some(vec!["zsteg".into()])).unwrap_err();
        assert!(matches!(err, StegoError::Config(ConfigError::UnknownTool(name)) if name == "zsteg"));
    }

    #[test]
    fn preview_cuts_long_output() {
        let text = (0..10).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let shown = preview(&text, 3);
        assert!(shown.starts_with("0\n1\n2\n"));
        assert!(shown.contains("7 more lines"));
        assert_eq!(preview("a\nb\n", 3), "a\nb");
    }
}
