//! mathlang: MathLang compiler with signed bytecode artifacts
//!
//! Source text is parsed and lowered to Python/SymPy by [`mathlang_core`]
//! (re-exported as [`lang`]). This crate wraps the result in a signed
//! artifact:
//! - [`compiler`] - compile to `payload || HMAC-SHA256`, verify on decompile
//! - [`signing`] - signing keys, provisioned or ephemeral
//! - [`config`] - environment / YAML configuration
//! - [`adaptors`] - file-to-file helpers
//! - [`runtime`] - running executables in a host interpreter
//!
//! ```no_run
//! use mathlang::{Compiler, SigningKey};
//!
//! let compiler = Compiler::new(SigningKey::generate());
//! let artifact = compiler.compile(r#"PRINT "Hello World";"#)?;
//! let decompiled = compiler.decompile(&artifact, false)?;
//! assert!(decompiled.is_verified());
//! # Ok::<(), mathlang::CompileError>(())
//! ```

pub use mathlang_core as lang;

pub mod adaptors;
pub mod bytecode;
pub mod compiler;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod signing;

pub use bytecode::Executable;
pub use compiler::{Compiler, Decompiled, Verification};
pub use config::Config;
pub use error::{CompileError, ConfigError, UnverifiedReason};
pub use logging::init_tracing;
pub use runtime::{execute, HostRuntime, PythonProcess, RunOutput};
pub use signing::SigningKey;
