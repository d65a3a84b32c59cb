//! Executable payload format
//!
//! An executable is the generated host program plus a small header, encoded
//! with bincode (fixed-width integers, little endian, no trailing bytes).
//! The signature is appended by the compiler and is not part of this format.

use bincode::Options;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CompileError;

pub const MAGIC: [u8; 4] = *b"MLBC";
pub const FORMAT_VERSION: u16 = 1;

/// Upper bound on an encoded executable.
const MAX_PAYLOAD_BYTES: u64 = 64 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_PAYLOAD_BYTES)
        .reject_trailing_bytes()
}

/// A compiled MathLang program, ready for a host runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executable {
    magic: [u8; 4],
    format_version: u16,
    /// Name the program was compiled under, for runtime diagnostics.
    pub filename: String,
    /// Host-runtime source produced by the code generator.
    pub code: String,
}

impl Executable {
    pub fn new(filename: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            magic: MAGIC,
            format_version: FORMAT_VERSION,
            filename: filename.into(),
            code: code.into(),
        }
    }

    pub fn format_version(&self) -> u16 {
        self.format_version
    }

    pub fn encode(&self) -> Result<Vec<u8>, CompileError> {
        options()
            .serialize(self)
            .map_err(|e| CompileError::Encode(e.to_string()))
    }

    /// Decode a payload, rejecting anything that is not a current executable
    pub fn decode(bytes: &[u8]) -> Result<Self, CompileError> {
        let executable: Self = options()
            .deserialize(bytes)
            .map_err(|e| CompileError::ArtifactCorrupt(e.to_string()))?;
        if executable.magic != MAGIC {
            return Err(CompileError::ArtifactCorrupt(
                "not a MathLang executable".to_string(),
            ));
        }
        if executable.format_version != FORMAT_VERSION {
            return Err(CompileError::ArtifactCorrupt(format!(
                "unsupported format version {}",
                executable.format_version
            )));
        }
        Ok(executable)
    }

    /// SHA-256 of the generated code, hex encoded
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.code.as_bytes()))
    }
}
