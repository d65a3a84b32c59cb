//! Host runtime seam
//!
//! Generated programs are Python using SymPy. Running them is delegated to a
//! [`HostRuntime`]; [`PythonProcess`] pipes the code into an interpreter.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::bytecode::Executable;
use crate::compiler::Compiler;
use crate::error::CompileError;

/// Captured result of running an executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

pub trait HostRuntime {
    fn run(&self, executable: &Executable) -> Result<RunOutput, CompileError>;
}

/// Runs executables with `<interpreter> -`, feeding the code on stdin
#[derive(Debug, Clone)]
pub struct PythonProcess {
    interpreter: PathBuf,
}

impl Default for PythonProcess {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl PythonProcess {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

impl HostRuntime for PythonProcess {
    fn run(&self, executable: &Executable) -> Result<RunOutput, CompileError> {
        debug!(
            interpreter = %self.interpreter.display(),
            filename = %executable.filename,
            "running executable"
        );
        let mut child = Command::new(&self.interpreter)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Python reads the whole script before running it
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(executable.code.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }
}

/// Compile and run `source` without signature checks. Debugging only.
pub fn execute(source: &str, runtime: &impl HostRuntime) -> Result<RunOutput, CompileError> {
    warn!("execute() skips signature verification; use for debugging only");
    let compiler = Compiler::ephemeral();
    let artifact = compiler.compile(source)?;
    let decompiled = compiler.decompile(&artifact, true)?;
    let output = runtime.run(&decompiled.executable)?;
    if !output.success {
        return Err(CompileError::Runtime(output.stderr));
    }
    Ok(output)
}
