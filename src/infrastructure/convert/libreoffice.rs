use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

use super::{ConversionEngine, ConversionError};
use crate::modules::job::model::TargetFormat;

const STDERR_TAIL: usize = 2048;

/// Runs a headless LibreOffice (`soffice --convert-to`) for each conversion.
pub struct LibreOfficeEngine {
    program: String,
}

impl LibreOfficeEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn output_path(input: &Path, target: TargetFormat, out_dir: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        out_dir.join(format!("{}.{}", stem, target.extension()))
    }
}

/// `-env:UserInstallation=<file url>` for a profile directory. The path is
/// made absolute and percent-encoded.
fn user_installation_arg(profile: &Path) -> Result<String, ConversionError> {
    let absolute = std::path::absolute(profile).map_err(ConversionError::Spawn)?;
    let url = Url::from_directory_path(&absolute).map_err(|_| {
        ConversionError::Engine(format!(
            "profile path {} is not a valid file URL",
            absolute.display()
        ))
    })?;
    Ok(format!("-env:UserInstallation={}", url))
}

fn tail(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().rev().nth(STDERR_TAIL) {
        Some((idx, _)) => format!("...{}", &text[idx..]),
        None => text.to_string(),
    }
}

/// Kills the converter's whole process group when dropped while armed.
///
/// `soffice` is a launcher: the real `soffice.bin` runs as a grandchild, so
/// killing only the direct child leaves it running after a timeout.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            warn!("Killing abandoned converter process group {}", pgid);
            kill_process_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!("Failed to kill process group {}: {}", pgid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

#[async_trait::async_trait]
impl ConversionEngine for LibreOfficeEngine {
    async fn convert(
        &self,
        input: &Path,
        target: TargetFormat,
        out_dir: &Path,
    ) -> Result<PathBuf, ConversionError> {
        // LibreOffice locks its profile directory; one profile per job.
        let user_installation = user_installation_arg(&out_dir.join(".lo-profile"))?;

        info!("📄 Converting {} to {}", input.display(), target);

        let mut command = Command::new(&self.program);
        command
            .arg(&user_installation)
            .args([
                "--headless",
                "--invisible",
                "--nodefault",
                "--nofirststartwizard",
                "--nolockcheck",
                "--nologo",
                "--norestore",
                "--convert-to",
                target.extension(),
                "--outdir",
            ])
            .arg(out_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Leader of a fresh group, so the pgid equals the child's pid.
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(ConversionError::Spawn)?;
        let mut group = ProcessGroupGuard::new(child.id());

        let output = child
            .wait_with_output()
            .await
            .map_err(ConversionError::Spawn)?;
        group.disarm();

        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("soffice stdout: {}", String::from_utf8_lossy(&output.stdout).trim());

        if !output.status.success() {
            return Err(ConversionError::Failed {
                status: output.status.to_string(),
                stderr: tail(&stderr),
            });
        }

        let produced = Self::output_path(input, target, out_dir);
        if !tokio::fs::try_exists(&produced).await.unwrap_or(false) {
            // soffice exits 0 on some load failures and only reports on stderr.
            if !stderr.trim().is_empty() {
                return Err(ConversionError::Engine(tail(&stderr)));
            }
            return Err(ConversionError::MissingOutput(produced));
        }

        Ok(produced)
    }
}
