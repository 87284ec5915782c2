//! Classification of a fetched pre-commit configuration file.
//!
//! [`validate`] is a pure function of the [`ConfigArtifact`]: no I/O, no
//! configuration, no logging side effects beyond `debug` events. Checks are
//! structural only; the pre-commit tool's own schema is not enforced beyond
//! the presence of a non-empty top-level `repos` sequence.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_yaml::Value;
use tracing::debug;

use crate::{ComplianceVerdict, ConfigArtifact, ContentEncoding, FileContent, ValidationError};

/// Files at or below this size (in bytes) are treated as empty.
pub const EMPTY_FILE_THRESHOLD: u64 = 1;

/// Top-level key that must hold a non-empty sequence.
const REPOS_KEY: &str = "repos";

/// Classifies a configuration artifact.
///
/// | Artifact | Verdict |
/// |---|---|
/// | `NotFound` | `Missing` |
/// | `Found`, size ≤ 1 byte | `Empty` |
/// | `Found`, undecodable or not YAML | `MalformedYaml` |
/// | `Found`, YAML without a non-empty `repos` sequence | `InvalidSchema` |
/// | otherwise | `Compliant` |
///
/// # Errors
///
/// Returns [`ValidationError::Fetch`] when the artifact records a fetch fault
/// other than "not found". Callers must not treat this as `Missing`.
pub fn validate(artifact: &ConfigArtifact) -> Result<ComplianceVerdict, ValidationError> {
    match artifact {
        ConfigArtifact::NotFound => Ok(ComplianceVerdict::Missing),
        ConfigArtifact::FetchFailed(err) => Err(ValidationError::Fetch(err.clone())),
        ConfigArtifact::Found(content) => Ok(classify_content(content)),
    }
}

fn classify_content(content: &FileContent) -> ComplianceVerdict {
    if content.size <= EMPTY_FILE_THRESHOLD {
        debug!(size = content.size, "configuration file is empty");
        return ComplianceVerdict::Empty;
    }

    let Some(text) = decode(content) else {
        debug!("configuration file could not be decoded as UTF-8 text");
        return ComplianceVerdict::MalformedYaml;
    };

    let document: Value = match serde_yaml::from_str(&text) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "configuration file is not valid YAML");
            return ComplianceVerdict::MalformedYaml;
        }
    };

    if has_repos(&document) {
        ComplianceVerdict::Compliant
    } else {
        debug!("configuration file has no non-empty `repos` sequence");
        ComplianceVerdict::InvalidSchema
    }
}

/// Decodes the raw content into text, or `None` if it is not valid base64 /
/// UTF-8.
fn decode(content: &FileContent) -> Option<String> {
    match content.encoding {
        ContentEncoding::Utf8 => Some(content.raw.clone()),
        ContentEncoding::Base64 => {
            // The contents API wraps base64 at 60 columns.
            let compact: String = content
                .raw
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            let bytes = STANDARD.decode(compact).ok()?;
            String::from_utf8(bytes).ok()
        }
    }
}

fn has_repos(document: &Value) -> bool {
    document
        .as_mapping()
        .and_then(|mapping| mapping.get(REPOS_KEY))
        .and_then(Value::as_sequence)
        .is_some_and(|repos| !repos.is_empty())
}
