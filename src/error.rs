//! Error types for compiling, signing and decompiling MathLang artifacts
//!
//! Source problems (`Parse`) and artifact problems (`SignatureUnverified`,
//! `ArtifactCorrupt`) are separate variants: the first means "fix the
//! program and recompile", the second "fetch the artifact again".

use std::fmt;
use std::io;
use std::path::PathBuf;

use mathlang_core::{Interrupted, ParseError};
use thiserror::Error;

use crate::signing::KEY_LEN;

/// Why an artifact signature could not be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnverifiedReason {
    /// No signing key was provisioned for this process
    MissingKey,
    /// The signature does not match the payload under the configured key
    Mismatch,
}

impl fmt::Display for UnverifiedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnverifiedReason::MissingKey => f.write_str("no signing key found"),
            UnverifiedReason::Mismatch => f.write_str("signature verification failed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Signing key is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Signing key must be {} bytes, got {0}", KEY_LEN)]
    InvalidKeyLength(usize),

    #[error("Cannot read config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum CompileError {
    /// Parse-time interrupts convert to `Interrupted` instead
    #[error("Parse error: {0}")]
    Parse(ParseError),

    #[error("Compilation interrupted: {0}")]
    Interrupted(#[from] Interrupted),

    #[error("Unsafe decompilation refused: {0}")]
    SignatureUnverified(UnverifiedReason),

    #[error("Bytecode cannot be decompiled due to data corruption: {0}")]
    ArtifactCorrupt(String),

    #[error("Cannot encode executable: {0}")]
    Encode(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Interrupted(interrupted) => CompileError::Interrupted(interrupted),
            other => CompileError::Parse(other),
        }
    }
}

impl CompileError {
    /// The program text is at fault; fix it and recompile.
    pub fn is_source_error(&self) -> bool {
        matches!(self, CompileError::Parse(e) if !matches!(e, ParseError::Interrupted(_)))
    }

    /// The artifact is at fault; it should be fetched or rebuilt.
    pub fn is_artifact_error(&self) -> bool {
        matches!(
            self,
            CompileError::SignatureUnverified(_) | CompileError::ArtifactCorrupt(_)
        )
    }

    pub fn unverified_reason(&self) -> Option<UnverifiedReason> {
        match self {
            CompileError::SignatureUnverified(reason) => Some(*reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathlang_core::parse;

    #[test]
    fn error_display() {
        let err = CompileError::SignatureUnverified(UnverifiedReason::MissingKey);
        assert_eq!(
            err.to_string(),
            "Unsafe decompilation refused: no signing key found"
        );

        let err = ConfigError::InvalidKeyLength(7);
        assert!(err.to_string().contains("32"));
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn interrupted_parse_is_not_a_source_error() {
        let err: CompileError = ParseError::Interrupted(Interrupted::DeadlineExceeded).into();
        assert!(matches!(
            err,
            CompileError::Interrupted(Interrupted::DeadlineExceeded)
        ));
        assert!(!err.is_source_error());
        assert!(!err.is_artifact_error());

        let wrapped = CompileError::Parse(ParseError::Interrupted(Interrupted::Cancelled));
        assert!(!wrapped.is_source_error());
    }

    #[test]
    fn source_and_artifact_errors_are_distinct() {
        let parse_err: CompileError = parse("y = z;").unwrap_err().into();
        assert!(parse_err.is_source_error());
        assert!(!parse_err.is_artifact_error());

        let corrupt = CompileError::ArtifactCorrupt("truncated".into());
        assert!(corrupt.is_artifact_error());
        assert!(!corrupt.is_source_error());

        let unverified = CompileError::SignatureUnverified(UnverifiedReason::Mismatch);
        assert!(unverified.is_artifact_error());
        assert_eq!(
            unverified.unverified_reason(),
            Some(UnverifiedReason::Mismatch)
        );
    }
}
