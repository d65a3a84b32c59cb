//! File and byte adaptors around [`Compiler`]
//!
//! Thin conveniences for the common "source file in, artifact file out" and
//! reverse flows. Errors carry the path that failed.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::bytecode::Executable;
use crate::compiler::Compiler;

pub fn compile_file_to_file(
    compiler: &Compiler,
    in_file: impl AsRef<Path>,
    out_file: impl AsRef<Path>,
) -> Result<()> {
    let artifact = compile_file_to_bytecode(compiler, in_file)?;
    write(out_file.as_ref(), &artifact)
}

pub fn compile_source_to_file(
    compiler: &Compiler,
    source: &str,
    out_file: impl AsRef<Path>,
) -> Result<()> {
    let artifact = compile_source_to_bytecode(compiler, source)?;
    write(out_file.as_ref(), &artifact)
}

pub fn compile_file_to_bytecode(compiler: &Compiler, in_file: impl AsRef<Path>) -> Result<Vec<u8>> {
    let in_file = in_file.as_ref();
    let source = fs::read_to_string(in_file)
        .with_context(|| format!("Failed to read source {}", in_file.display()))?;
    compiler
        .compile(&source)
        .with_context(|| format!("Failed to compile {}", in_file.display()))
}

pub fn compile_source_to_bytecode(compiler: &Compiler, source: &str) -> Result<Vec<u8>> {
    Ok(compiler.compile(source)?)
}

/// Decompile an artifact file and write the recovered host program
pub fn decompile_file_to_file(
    compiler: &Compiler,
    in_file: impl AsRef<Path>,
    out_file: impl AsRef<Path>,
    unsafe_mode: bool,
) -> Result<()> {
    let executable = decompile_file_to_code(compiler, in_file, unsafe_mode)?;
    write(out_file.as_ref(), executable.code.as_bytes())
}

pub fn decompile_bytecode_to_file(
    compiler: &Compiler,
    artifact: &[u8],
    out_file: impl AsRef<Path>,
    unsafe_mode: bool,
) -> Result<()> {
    let executable = decompile_bytecode_to_code(compiler, artifact, unsafe_mode)?;
    write(out_file.as_ref(), executable.code.as_bytes())
}

pub fn decompile_file_to_code(
    compiler: &Compiler,
    in_file: impl AsRef<Path>,
    unsafe_mode: bool,
) -> Result<Executable> {
    let in_file = in_file.as_ref();
    let artifact =
        fs::read(in_file).with_context(|| format!("Failed to read artifact {}", in_file.display()))?;
    let decompiled = compiler
        .decompile(&artifact, unsafe_mode)
        .with_context(|| format!("Failed to decompile {}", in_file.display()))?;
    Ok(decompiled.executable)
}

pub fn decompile_bytecode_to_code(
    compiler: &Compiler,
    artifact: &[u8],
    unsafe_mode: bool,
) -> Result<Executable> {
    Ok(compiler.decompile(artifact, unsafe_mode)?.executable)
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}
