use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;

use crate::core::error::{LauncherError, LauncherResult};

/// Captured result of a finished external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Both streams, stderr first (`java -version` writes there).
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stderr, self.stdout)
    }
}

/// Runs a program to completion and captures its output. Runtime probing and
/// the loader installers go through this so they can be exercised without
/// a JVM.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        cwd: Option<&Path>,
    ) -> LauncherResult<CommandOutput>;
}

/// Real process execution on the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        cwd: Option<&Path>,
    ) -> LauncherResult<CommandOutput> {
        let mut command = tokio::process::Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        #[cfg(target_os = "windows")]
        {
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let output = command.output().await.map_err(|e| {
            LauncherError::JavaExecution(format!("cannot run {}: {}", program.display(), e))
        })?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_streams_and_status() {
        let out = SystemCommandRunner
            .run(
                Path::new("sh"),
                &["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()],
                None,
            )
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let result = SystemCommandRunner
            .run(Path::new("/definitely/not/here/java"), &[], None)
            .await;
        assert!(matches!(result, Err(LauncherError::JavaExecution(_))));
    }
}
