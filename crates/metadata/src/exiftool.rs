//! ExifTool-backed [`MetadataWriter`].
//!
//! The tool is validated once per session with [`ExifTool::locate`]; fetching
//! or upgrading the binary is left to the application.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::str::FromStr;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use core_types::{MetadataProfile, ProfileField};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{MetadataWriter, WriteError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("ExifTool not found at {0}")]
    NotFound(PathBuf),

    #[error("ExifTool {found} is older than the required {required}")]
    VersionTooOld {
        found: ToolVersion,
        required: ToolVersion,
    },

    #[error("unexpected ExifTool version output: {0:?}")]
    UnexpectedOutput(String),

    #[error("ExifTool did not answer within {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// `major.minor` as printed by `exiftool -ver` (e.g. `12.76`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ToolVersion {
    pub major: u32,
    pub minor: u32,
}

impl ToolVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

impl FromStr for ToolVersion {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unexpected = || ToolError::UnexpectedOutput(trimmed.to_string());
        let (major, minor) = trimmed.split_once('.').unwrap_or((trimmed, "0"));
        // Development builds append a suffix, e.g. "13.01 [Warning: ...]".
        let minor: String = minor.chars().take_while(char::is_ascii_digit).collect();
        Ok(Self {
            major: major.parse().map_err(|_| unexpected())?,
            minor: if minor.is_empty() {
                0
            } else {
                minor.parse().map_err(|_| unexpected())?
            },
        })
    }
}

/// How to launch the tool: a program plus leading arguments, so a Perl
/// distribution can run as `perl /opt/exiftool/exiftool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            leading_args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args);
        cmd
    }
}

impl Default for ToolCommand {
    fn default() -> Self {
        Self::new(if cfg!(windows) { "exiftool.exe" } else { "exiftool" })
    }
}

/// A validated ExifTool installation.
#[derive(Debug, Clone)]
pub struct ExifTool {
    command: ToolCommand,
    version: ToolVersion,
    timeout: Duration,
}

impl ExifTool {
    /// Runs `<tool> -ver` and checks the answer against `minimum`.
    pub fn locate(command: ToolCommand, minimum: ToolVersion) -> Result<Self, ToolError> {
        let mut check = command.command();
        check.arg("-ver");
        let finished = run_with_timeout(check, VERSION_CHECK_TIMEOUT).map_err(|err| match err {
            RunError::Spawn(err) if err.kind() == io::ErrorKind::NotFound => {
                ToolError::NotFound(command.program.clone())
            }
            RunError::Spawn(err) | RunError::Wait(err) => ToolError::Io(err),
            RunError::TimedOut => ToolError::Timeout(VERSION_CHECK_TIMEOUT),
        })?;

        if !finished.status.success() {
            return Err(ToolError::UnexpectedOutput(finished.stderr.trim().to_string()));
        }

        let version: ToolVersion = finished.stdout.parse()?;
        if version < minimum {
            return Err(ToolError::VersionTooOld {
                found: version,
                required: minimum,
            });
        }

        info!(program = %command.program.display(), %version, "ExifTool ready");
        Ok(Self {
            command,
            version,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn version(&self) -> ToolVersion {
        self.version
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Tag assignments for the non-blank fields of `profile`.
    pub fn tag_arguments(profile: &MetadataProfile) -> Result<Vec<String>, WriteError> {
        let mut args = Vec::new();
        for (field, value) in profile.fields() {
            match field {
                ProfileField::LensMake => args.push(format!("-EXIF:LensMake={value}")),
                ProfileField::LensModel => args.push(format!("-EXIF:LensModel={value}")),
                ProfileField::LensSerial => {
                    args.push(format!("-EXIF:LensSerialNumber={value}"))
                }
                ProfileField::FocalLength => {
                    let mm = numeric(field, value, &[], &["mm"])?;
                    args.push(format!("-EXIF:FocalLength={mm}"));
                }
                ProfileField::Aperture => {
                    let f_number = numeric(field, value, &["f/", "f"], &[])?;
                    args.push(format!("-EXIF:FNumber={f_number}"));
                }
                ProfileField::Notes => {
                    args.push(format!("-EXIF:ImageDescription={value}"));
                    args.push(format!("-XMP-dc:Description={value}"));
                }
            }
        }
        Ok(args)
    }
}

impl MetadataWriter for ExifTool {
    fn write(&self, path: &Path, profile: &MetadataProfile) -> Result<(), WriteError> {
        let tags = Self::tag_arguments(profile)?;
        if tags.is_empty() {
            debug!(?path, "profile has no values, skipping ExifTool");
            return Ok(());
        }

        let mut cmd = self.command.command();
        cmd.arg("-overwrite_original").args(&tags).arg(path);

        let finished = run_with_timeout(cmd, self.timeout).map_err(|err| match err {
            RunError::Spawn(err) if err.kind() == io::ErrorKind::NotFound => {
                WriteError::ToolUnavailable(format!(
                    "{} could not be started: {err}",
                    self.command.program.display()
                ))
            }
            RunError::Spawn(err) | RunError::Wait(err) => WriteError::Io(err.to_string()),
            RunError::TimedOut => WriteError::Timeout(self.timeout),
        })?;

        if finished.status.success() {
            debug!(?path, tags = tags.len(), "metadata written");
            Ok(())
        } else {
            warn!(?path, status = ?finished.status.code(), "ExifTool reported an error");
            Err(WriteError::Failed {
                code: finished.status.code(),
                stderr: finished.stderr.trim().to_string(),
            })
        }
    }
}

/// Strips unit decorations (`85mm`, `f/2.8`) and checks the rest is a
/// positive number. The cleaned text is passed through unchanged.
fn numeric<'a>(
    field: ProfileField,
    value: &'a str,
    prefixes: &[&str],
    suffixes: &[&str],
) -> Result<&'a str, WriteError> {
    let mut cleaned = value.trim();
    for prefix in prefixes {
        let matches = cleaned
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches {
            cleaned = cleaned[prefix.len()..].trim_start();
            break;
        }
    }
    for suffix in suffixes {
        let cut = cleaned.len().saturating_sub(suffix.len());
        if cleaned.is_char_boundary(cut) && cleaned[cut..].eq_ignore_ascii_case(suffix) {
            cleaned = cleaned[..cut].trim_end();
            break;
        }
    }

    match cleaned.parse::<f64>() {
        Ok(number) if number.is_finite() && number > 0.0 => Ok(cleaned),
        _ => Err(WriteError::InvalidTag {
            field: field.label(),
            value: value.to_string(),
        }),
    }
}

struct Finished {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

enum RunError {
    Spawn(io::Error),
    Wait(io::Error),
    TimedOut,
}

/// Runs `command` to completion, killing it once `timeout` has elapsed.
fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<Finished, RunError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn().map_err(RunError::Spawn)?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait().map_err(RunError::Wait)? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RunError::TimedOut);
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    Ok(Finished {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
