//! Artifact compiler and signer
//!
//! An artifact is `payload || signature`: the bincode-encoded
//! [`Executable`] followed by a 32 byte HMAC-SHA256 over the payload.
//!
//! Decompiling verifies the signature first. An unprovisioned compiler (one
//! running on the per-process ephemeral key) never treats a signature as
//! verified. Unverified artifacts are only decoded when the caller opts into
//! unsafe mode; decoding failures are reported separately as corruption.

use mathlang_core::{generate, parse_with, Interrupt, Program};
use tracing::{debug, info, warn};

use crate::bytecode::Executable;
use crate::config::{Config, DEFAULT_FILENAME};
use crate::error::{CompileError, UnverifiedReason};
use crate::signing::{ephemeral_key, SigningKey, SIGNATURE_LEN};

/// Outcome of signature checking during decompilation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified,
    /// Accepted in unsafe mode without a trusted signature.
    Skipped(UnverifiedReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decompiled {
    pub executable: Executable,
    pub verification: Verification,
}

impl Decompiled {
    pub fn is_verified(&self) -> bool {
        self.verification == Verification::Verified
    }
}

#[derive(Debug, Clone)]
pub struct Compiler {
    key: SigningKey,
    provisioned: bool,
    filename: String,
    unsafe_default: bool,
}

impl Compiler {
    /// Compiler signing and verifying with a provisioned key
    pub fn new(key: SigningKey) -> Self {
        Self {
            key,
            provisioned: true,
            filename: DEFAULT_FILENAME.to_string(),
            unsafe_default: false,
        }
    }

    /// Compiler signing with this process's ephemeral key
    pub fn ephemeral() -> Self {
        Self {
            key: ephemeral_key().clone(),
            provisioned: false,
            filename: DEFAULT_FILENAME.to_string(),
            unsafe_default: false,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, CompileError> {
        let compiler = match config.signing_key()? {
            Some(key) => Self::new(key),
            None => Self::ephemeral(),
        };
        Ok(compiler
            .with_filename(&config.target_filename)
            .with_unsafe_default(config.unsafe_decompile))
    }

    /// Build from `MATHLANG_*` environment variables
    pub fn from_env() -> Result<Self, CompileError> {
        Self::from_config(&Config::from_env())
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_unsafe_default(mut self, allow: bool) -> Self {
        self.unsafe_default = allow;
        self
    }

    /// Key used for signing, for provisioning other processes
    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }

    pub fn is_provisioned(&self) -> bool {
        self.provisioned
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    // ========================================================================
    // Compile
    // ========================================================================

    pub fn compile(&self, source: &str) -> Result<Vec<u8>, CompileError> {
        self.compile_with(source, &Interrupt::new())
    }

    /// Compile, checking `interrupt` while parsing and before signing
    pub fn compile_with(
        &self,
        source: &str,
        interrupt: &Interrupt,
    ) -> Result<Vec<u8>, CompileError> {
        let parsed = parse_with(source, interrupt)?;
        interrupt.check()?;
        self.compile_program(&parsed.program)
    }

    pub fn compile_program(&self, program: &Program) -> Result<Vec<u8>, CompileError> {
        let code = generate(program);
        let executable = Executable::new(self.filename.as_str(), code);
        let mut artifact = executable.encode()?;
        let signature = self.key.sign(&artifact);
        debug!(payload_bytes = artifact.len(), "signed payload");
        artifact.extend_from_slice(&signature);
        info!(
            filename = %self.filename,
            statements = program.statements.len(),
            artifact_bytes = artifact.len(),
            "compiled program"
        );
        Ok(artifact)
    }

    // ========================================================================
    // Decompile
    // ========================================================================

    pub fn decompile(&self, artifact: &[u8], unsafe_mode: bool) -> Result<Decompiled, CompileError> {
        if artifact.len() < SIGNATURE_LEN {
            return Err(CompileError::ArtifactCorrupt(format!(
                "artifact is {} bytes, shorter than its {} byte signature",
                artifact.len(),
                SIGNATURE_LEN
            )));
        }
        let (payload, signature) = artifact.split_at(artifact.len() - SIGNATURE_LEN);

        let verification = self.verify(payload, signature);
        if let Verification::Skipped(reason) = verification {
            if !unsafe_mode {
                debug!(%reason, "refusing unverified artifact");
                return Err(CompileError::SignatureUnverified(reason));
            }
            warn!(%reason, "Decompiling unverified artifact in unsafe mode");
        }

        let executable = Executable::decode(payload)?;
        info!(
            filename = %executable.filename,
            verified = verification == Verification::Verified,
            "decompiled artifact"
        );
        Ok(Decompiled {
            executable,
            verification,
        })
    }

    /// Decompile using the configured unsafe default
    pub fn decompile_configured(&self, artifact: &[u8]) -> Result<Decompiled, CompileError> {
        self.decompile(artifact, self.unsafe_default)
    }

    fn verify(&self, payload: &[u8], signature: &[u8]) -> Verification {
        if !self.provisioned {
            Verification::Skipped(UnverifiedReason::MissingKey)
        } else if self.key.verify(payload, signature) {
            Verification::Verified
        } else {
            Verification::Skipped(UnverifiedReason::Mismatch)
        }
    }
}
