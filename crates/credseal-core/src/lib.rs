pub mod config;
pub mod error;
pub mod gateway;
pub mod job;
pub mod manifest;
pub mod orchestrator;
pub mod request;
pub mod tool;

pub use config::{SigningConfig, ToolConfig, ALLOWED_EXTENSIONS};
pub use error::{Error, ErrorKind, Result};
pub use gateway::resolve_download;
pub use job::SigningJob;
pub use manifest::{
    Action, ActionsData, Assertion, AssertionData, ManifestBuilder, ManifestDescriptor,
    MetadataData,
};
pub use orchestrator::{Orchestrator, SignedVideo, StepOutcome};
pub use request::{sanitize_text, validate_extension, SigningRequest};
pub use tool::{
    run_tool, C2paTool, CommandOutput, SigningResult, SigningTool, ToolError, ToolResult,
    VerificationReport,
};
