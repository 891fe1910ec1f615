//! Host C compiler checks for `--check-cc`.

use std::io;
use std::path::Path;
use std::process::Command;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("failed to execute `{cc}`: {source}")]
    Spawn {
        cc: String,
        #[source]
        source: io::Error,
    },
    #[error("`{cc}` rejected {path} ({status}):\n{stderr}")]
    Rejected {
        cc: String,
        path: String,
        status: String,
        stderr: String,
    },
}

/// C compiler to invoke: `CHILLC_CC`, or `cc`.
pub fn cc_bin() -> String {
    std::env::var("CHILLC_CC")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "cc".to_string())
}

/// Compile `path` with `-std=c11 -pthread -fsyntax-only`, so generated
/// code is checked by a real compiler without producing an object.
pub fn check_c_source(path: &Path) -> Result<(), ToolchainError> {
    let cc = cc_bin();
    tracing::info!(cc = %cc, path = %path.display(), "checking generated C");
    let out = Command::new(&cc)
        .args(["-std=c11", "-pthread", "-fsyntax-only", "-Wall"])
        .arg(path)
        .output()
        .map_err(|source| ToolchainError::Spawn {
            cc: cc.clone(),
            source,
        })?;
    let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
    if !out.status.success() {
        return Err(ToolchainError::Rejected {
            cc,
            path: path.display().to_string(),
            status: out.status.to_string(),
            stderr,
        });
    }
    if !stderr.is_empty() {
        tracing::warn!(cc = %cc, "C compiler reported:\n{stderr}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_compiler_is_a_spawn_error() {
        let err = Command::new("chillc-no-such-cc")
            .output()
            .map_err(|source| ToolchainError::Spawn {
                cc: "chillc-no-such-cc".to_string(),
                source,
            })
            .expect_err("binary should not exist");
        assert!(err.to_string().starts_with("failed to execute `chillc-no-such-cc`"));
    }
}
