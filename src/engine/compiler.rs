//! Compiler subprocess.

use crate::engine::errors::CompileError;
use crate::{debug, error, info};
use std::ffi::OsString;
use std::path::Path;
use tokio::process::Command;

/// Target revision passed to the compiler.
pub const EVM_VERSION: &str = "shanghai";

/// Argument list for compiling `source` into `out_dir`.
pub fn compiler_args(
    source: &Path,
    out_dir: &Path,
    base_path: Option<&Path>,
    include_path: Option<&Path>,
) -> Result<Vec<OsString>, CompileError> {
    if include_path.is_some() && base_path.is_none() {
        return Err(CompileError::IncludeWithoutBase);
    }
    let mut args: Vec<OsString> = [
        "--evm-version",
        EVM_VERSION,
        "--overwrite",
        "-o",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(out_dir.into());
    args.extend(["--optimize", "--bin", "--abi"].map(OsString::from));
    if let Some(base) = base_path {
        args.push("--base-path".into());
        args.push(base.into());
    }
    if let Some(include) = include_path {
        args.push("--include-path".into());
        args.push(include.into());
    }
    args.push(source.into());
    Ok(args)
}

/// Runs the compiler and waits for it. Success is exit code 0 only.
pub async fn compile(
    solc: &Path,
    source: &Path,
    out_dir: &Path,
    base_path: Option<&Path>,
    include_path: Option<&Path>,
) -> Result<(), CompileError> {
    let args = compiler_args(source, out_dir, base_path, include_path)?;
    if !tokio::fs::try_exists(source).await.unwrap_or(false) {
        error!("compile: source {} does not exist", source.display());
        return Err(CompileError::SourceMissing(source.to_path_buf()));
    }

    debug!("compile: {} {:?}", solc.display(), args);
    let output = Command::new(solc).args(&args).output().await?;
    info!(
        "Compiler exited with code {:?} for {}\n{}{}",
        output.status.code(),
        source.display(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    if !output.status.success() {
        return Err(CompileError::Failed {
            code: output.status.code(),
        });
    }
    Ok(())
}
