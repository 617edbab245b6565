use std::path::Path;

use serde::Serialize;

use crate::config::ALLOWED_EXTENSIONS;
use crate::{Error, Result};

const MAX_ORGANIZATION_CHARS: usize = 200;
const MAX_AI_TOOL_CHARS: usize = 200;
const MAX_TITLE_CHARS: usize = 300;
const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Strip characters that are unsafe in markup: `< > " ' &`
pub fn sanitize_text(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | '&'))
        .collect()
}

/// Lowercased extension of `filename` (with leading dot), if it is one we sign.
pub fn validate_extension(filename: &str) -> Result<String> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(Error::InvalidExtension {
            extension,
            allowed: ALLOWED_EXTENSIONS.iter().map(ToString::to_string).collect(),
        });
    }

    Ok(extension)
}

/// Authorship metadata submitted alongside a video, validated and sanitized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningRequest {
    pub organization: String,
    pub ai_tool: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl SigningRequest {
    pub fn new(
        organization: &str,
        ai_tool: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            organization: required("organization", organization, MAX_ORGANIZATION_CHARS)?,
            ai_tool: required("ai_tool", ai_tool, MAX_AI_TOOL_CHARS)?,
            title: optional("title", title, MAX_TITLE_CHARS)?,
            description: optional("description", description, MAX_DESCRIPTION_CHARS)?,
        })
    }
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(Error::InvalidField {
            field,
            reason: format!("must be at most {max} characters (got {len})"),
        });
    }
    Ok(())
}

fn required(field: &'static str, value: &str, max: usize) -> Result<String> {
    check_length(field, value, max)?;
    let clean = sanitize_text(value);
    if clean.trim().is_empty() {
        return Err(Error::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(clean)
}

fn optional(field: &'static str, value: Option<&str>, max: usize) -> Result<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    check_length(field, value, max)?;
    let clean = sanitize_text(value);
    Ok((!clean.trim().is_empty()).then_some(clean))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_markup_characters() {
        assert_eq!(sanitize_text("O'Reilly & <Sons>"), "OReilly  Sons");
        assert_eq!(sanitize_text("say \"hi\""), "say hi");
        assert_eq!(sanitize_text("Runway Gen-3"), "Runway Gen-3");
    }

    #[test]
    fn test_validate_extension() {
        assert_eq!(validate_extension("clip.mp4").unwrap(), ".mp4");
        assert_eq!(validate_extension("CLIP.MOV").unwrap(), ".mov");
        assert_eq!(validate_extension("a.b.m4v").unwrap(), ".m4v");

        let err = validate_extension("clip.avi").unwrap_err();
        assert!(matches!(err, Error::InvalidExtension { ref extension, .. } if extension == ".avi"));

        assert!(validate_extension("noext").is_err());
        assert!(validate_extension("mp4").is_err());
    }

    #[test]
    fn test_request_sanitizes_all_fields() {
        let req = SigningRequest::new(
            "O'Reilly & <Sons>",
            "<b>Sora</b>",
            Some("\"Lake\""),
            Some("a & b"),
        )
        .unwrap();

        assert_eq!(req.organization, "OReilly  Sons");
        assert_eq!(req.ai_tool, "bSora/b");
        assert_eq!(req.title.as_deref(), Some("Lake"));
        assert_eq!(req.description.as_deref(), Some("a  b"));
    }

    #[test]
    fn test_required_fields_must_survive_sanitization() {
        let err = SigningRequest::new("<>&", "Runway", None, None).unwrap_err();
        assert!(matches!(err, Error::InvalidField { field: "organization", .. }));

        let err = SigningRequest::new("Acme", "   ", None, None).unwrap_err();
        assert!(matches!(err, Error::InvalidField { field: "ai_tool", .. }));
    }

    #[test]
    fn test_length_limits() {
        let long_org = "x".repeat(201);
        assert!(SigningRequest::new(&long_org, "tool", None, None).is_err());
        assert!(SigningRequest::new(&"x".repeat(200), "tool", None, None).is_ok());

        let long_title = "t".repeat(301);
        let err = SigningRequest::new("Acme", "tool", Some(&long_title), None).unwrap_err();
        assert!(matches!(err, Error::InvalidField { field: "title", .. }));

        let long_desc = "d".repeat(1001);
        assert!(SigningRequest::new("Acme", "tool", None, Some(&long_desc)).is_err());
    }

    #[test]
    fn test_blank_optional_fields_are_absent() {
        let req = SigningRequest::new("Acme", "tool", Some(""), Some("'&'")).unwrap();
        assert_eq!(req.title, None);
        assert_eq!(req.description, None);
    }
}
