//! Discovery manifest served at `/register`
//!
//! The manifest lists every registered output and sensor with its assigned
//! id. Two renderings exist:
//! - `Json`: strict JSON built with serde, descriptor text is escaped
//! - `Legacy`: the single-quoted quasi-JSON older clients parse. Values are
//!   spliced in verbatim, so a `'` inside a name or description corrupts the
//!   document.

use serde::{Deserialize, Serialize};
use std::fmt::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to serialize manifest: {0}")]
    SerializeError(#[from] serde_json::Error),
    #[error("Failed to format manifest: {0}")]
    FormatError(#[from] std::fmt::Error),
}

/// How the manifest is rendered on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    #[default]
    Json,
    Legacy,
}

/// Manifest entry for one output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputEntry {
    pub name: String,
    pub description: String,
    pub is_binary: bool,
    pub output_id: usize,
    pub min: i32,
    pub max: i32,
}

/// Manifest entry for one sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputEntry {
    pub name: String,
    pub description: String,
    pub input_id: usize,
}

/// The finished discovery document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub outputs: Vec<OutputEntry>,
    pub inputs: Vec<InputEntry>,
}

impl Manifest {
    /// Render the manifest in the requested format
    pub fn render(&self, format: ManifestFormat) -> Result<String, ManifestError> {
        match format {
            ManifestFormat::Json => Ok(serde_json::to_string(self)?),
            ManifestFormat::Legacy => self.to_legacy_string(),
        }
    }

    /// Content type matching `render`
    pub fn content_type(format: ManifestFormat) -> &'static str {
        match format {
            ManifestFormat::Json => "application/json",
            ManifestFormat::Legacy => "text/plain",
        }
    }

    fn to_legacy_string(&self) -> Result<String, ManifestError> {
        let mut out = String::from("{'outputs':[");
        for o in &self.outputs {
            write!(
                out,
                "{{'name':'{}','description':'{}','isBinary':'{}','outputId':'{}','min':'{}','max':'{}'}},",
                o.name,
                o.description,
                u8::from(o.is_binary),
                o.output_id,
                o.min,
                o.max
            )?;
        }
        out.push_str("],'inputs': [");
        for i in &self.inputs {
            write!(
                out,
                "{{'name':'{}', 'description':'{}','inputId':'{}'}},",
                i.name, i.description, i.input_id
            )?;
        }
        out.push_str("]}");
        Ok(out)
    }
}

/// Accumulates manifest entries during registration
#[derive(Debug, Default)]
pub struct ManifestBuilder {
    outputs: Vec<OutputEntry>,
    inputs: Vec<InputEntry>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_output(&mut self, entry: OutputEntry) {
        self.outputs.push(entry);
    }

    pub fn push_input(&mut self, entry: InputEntry) {
        self.inputs.push(entry);
    }

    pub fn finish(self) -> Manifest {
        Manifest {
            outputs: self.outputs,
            inputs: self.inputs,
        }
    }
}
