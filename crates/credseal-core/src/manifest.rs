//! Manifest descriptors handed to the signing tool.
//!
//! A descriptor names the signing algorithm and key material, identifies this
//! service as the claim generator, and carries the assertions that end up in
//! the embedded content credentials.

use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SigningConfig;
use crate::request::SigningRequest;
use crate::{Error, Result};

pub const ACTIONS_LABEL: &str = "c2pa.actions";
pub const METADATA_LABEL: &str = "stds.iptc.photo-metadata";
pub const CREATED_ACTION: &str = "c2pa.created";
pub const TRAINED_ALGORITHMIC_MEDIA: &str =
    "http://cv.iptc.org/newscodes/digitalsourcetype/trainedAlgorithmicMedia";
pub const MANIFEST_TITLE: &str = "AI Generated Content Credentials";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestDescriptor {
    pub alg: String,
    pub private_key: PathBuf,
    pub sign_cert: PathBuf,
    pub claim_generator: String,
    pub title: String,
    pub assertions: Vec<Assertion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    pub label: String,
    pub data: AssertionData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssertionData {
    Actions(ActionsData),
    Metadata(MetadataData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionsData {
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub action: String,
    pub software_agent: String,
    pub when: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataData {
    pub creator: Vec<String>,
    pub credit_line: String,
    pub digital_source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl ManifestDescriptor {
    /// Assemble the descriptor for one request. Only `created_at` varies
    /// between calls with the same inputs.
    pub fn build(config: &SigningConfig, request: &SigningRequest, created_at: DateTime<Utc>) -> Self {
        let actions = Assertion {
            label: ACTIONS_LABEL.to_string(),
            data: AssertionData::Actions(ActionsData {
                actions: vec![Action {
                    action: CREATED_ACTION.to_string(),
                    software_agent: request.ai_tool.clone(),
                    when: created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                }],
            }),
        };

        let metadata = Assertion {
            label: METADATA_LABEL.to_string(),
            data: AssertionData::Metadata(MetadataData {
                creator: vec![request.organization.clone()],
                credit_line: request.organization.clone(),
                digital_source_type: TRAINED_ALGORITHMIC_MEDIA.to_string(),
                headline: request.title.clone(),
                caption: request.description.clone(),
            }),
        };

        Self {
            alg: config.signing_alg.clone(),
            private_key: config.private_key_path.clone(),
            sign_cert: config.cert_path.clone(),
            claim_generator: config.claim_generator(),
            title: MANIFEST_TITLE.to_string(),
            assertions: vec![actions, metadata],
        }
    }

    pub fn assertion(&self, label: &str) -> Option<&AssertionData> {
        self.assertions
            .iter()
            .find(|a| a.label == label)
            .map(|a| &a.data)
    }
}

/// Writes descriptors into the manifest working directory
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    dir: PathBuf,
}

impl ManifestBuilder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Serialize `descriptor` to a fresh `manifest_<uuid>.json` and return its path.
    pub async fn write(&self, descriptor: &ManifestDescriptor) -> Result<PathBuf> {
        let path = self.dir.join(format!("manifest_{}.json", Uuid::new_v4()));
        let body = serde_json::to_vec_pretty(descriptor)?;

        tokio::fs::write(&path, body)
            .await
            .map_err(|source| Error::ManifestWrite {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "Wrote manifest descriptor");
        Ok(path)
    }
}
