//! Detached process launching for the terminal backend.
//!
//! The launched process gets null stdio and its own process group, so it
//! outlives the caller and never receives the caller's terminal signals.
//! The caller keeps the PID together with the process start time; a PID
//! is only signalled while its start time still matches, so a recycled
//! PID never receives a stray SIGTERM.

use std::path::Path;
use std::process::{Command, Stdio};

use sysinfo::{Pid, System};
use thiserror::Error;
use tracing::debug;

/// Errors from launching or signalling a detached process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The program string was empty
    #[error("no program to launch")]
    EmptyProgram,

    /// The OS refused to start the process
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The PID is gone or now belongs to a different process
    #[error("process {pid} is no longer the launched process")]
    Replaced { pid: u32 },

    /// Sending a signal failed
    #[error("failed to signal process {pid}")]
    Signal { pid: u32 },
}

/// A launched process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Launched {
    pub pid: u32,
    /// Start time in seconds since the epoch, when it could be read.
    pub started_at: Option<u64>,
}

/// Starts `program` with `args` in `dir`, detached from the caller.
///
/// The process is not waited on.
pub fn spawn_detached(program: &str, args: &[String], dir: &Path) -> Result<Launched, LaunchError> {
    if program.trim().is_empty() {
        return Err(LaunchError::EmptyProgram);
    }

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    if dir.is_dir() {
        command.current_dir(dir);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let child = command.spawn().map_err(|source| LaunchError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let pid = child.id();
    let started_at = start_time(pid);
    debug!(program, pid, started_at, "Launched detached process");
    Ok(Launched { pid, started_at })
}

/// Returns the start time of process `pid`, in seconds since the epoch.
///
/// `None` when no such process exists.
#[must_use]
pub fn start_time(pid: u32) -> Option<u64> {
    let mut system = System::new();
    system.refresh_all();
    system.process(Pid::from_u32(pid)).map(|p| p.start_time())
}

/// Sends SIGTERM to `pid` if it is still the process started at `started_at`.
///
/// # Errors
///
/// * `LaunchError::Replaced` - the process exited or the PID was reused
/// * `LaunchError::Signal` - kill(2) failed
pub fn terminate(pid: u32, started_at: u64) -> Result<(), LaunchError> {
    if start_time(pid) != Some(started_at) {
        return Err(LaunchError::Replaced { pid });
    }

    #[cfg(unix)]
    {
        let Ok(raw) = i32::try_from(pid) else {
            return Err(LaunchError::Signal { pid });
        };
        // SAFETY: kill(2) has no memory-safety preconditions
        let result = unsafe { libc::kill(raw, libc::SIGTERM) };
        if result != 0 {
            return Err(LaunchError::Signal { pid });
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        Err(LaunchError::Signal { pid })
    }
}
