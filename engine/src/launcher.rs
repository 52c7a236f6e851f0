//! Spawning the engine as a child process wired to two pipes.

use std::ffi::OsStr;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use crate::EngineError;

/// A running engine together with the parent's ends of its pipes.
#[derive(Debug)]
pub struct EngineProcess {
    pub child: Child,
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
}

impl EngineProcess {
    pub fn id(&self) -> u32 {
        self.child.id()
    }
}

/// Spawn `command` with `argv` as its arguments.
///
/// The child gets piped stdin and stdout, with stderr folded into the stdout
/// pipe. It runs in its own process group so terminal signals aimed at the
/// caller do not reach it, and its niceness is raised by `nice_increment`
/// when possible. argv[0] is `command` itself.
///
/// Every descriptor std creates is close-on-exec, so the child keeps only
/// fds 0-2 and the parent keeps only its own pipe ends. If exec fails the
/// child exits immediately and the failure comes back here as
/// [`EngineError::Spawn`].
///
/// # Errors
///
/// Returns [`EngineError::Spawn`] if the pipes, fork or exec fail, and
/// [`EngineError::MissingPipe`] if a pipe end was not handed back (the child
/// is killed and reaped in that case).
#[tracing::instrument(level = "info", skip(argv))]
pub fn spawn<I, S>(
    command: &Path,
    argv: I,
    nice_increment: i32,
) -> Result<EngineProcess, EngineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(command);
    cmd.args(argv)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        // Replaced by the stdout pipe in pre_exec below.
        .stderr(Stdio::null())
        .process_group(0);

    // SAFETY: the closure runs between fork and exec and only calls dup2 and
    // nice, both async-signal-safe. It captures a plain integer.
    unsafe {
        cmd.pre_exec(move || {
            if libc::dup2(libc::STDOUT_FILENO, libc::STDERR_FILENO) == -1 {
                return Err(std::io::Error::last_os_error());
            }
            if nice_increment != 0 {
                // Best effort: an engine at normal priority still works.
                let _ = libc::nice(nice_increment);
            }
            Ok(())
        });
    }

    let mut child = cmd.spawn().map_err(|source| {
        tracing::error!("Failed to spawn engine {:?}: {}", command, source);
        EngineError::Spawn {
            path: command.to_path_buf(),
            source,
        }
    })?;
    tracing::info!("Engine spawned with pid {}", child.id());

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    match (stdin, stdout) {
        (Some(stdin), Some(stdout)) => Ok(EngineProcess {
            child,
            stdin,
            stdout,
        }),
        (stdin, _) => {
            let missing = if stdin.is_none() { "stdin" } else { "stdout" };
            tracing::error!("Engine started without {}; killing it", missing);
            let _ = child.kill();
            let _ = child.wait();
            Err(EngineError::MissingPipe(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_spawn_missing_binary_is_an_error() {
        let result = spawn(Path::new("/nonexistent/engine/binary"), [""; 0], 0);
        assert!(matches!(result, Err(EngineError::Spawn { .. })));
    }

    #[test]
    fn test_spawn_pipes_round_trip() {
        let mut process = spawn(Path::new("/bin/cat"), [""; 0], 0).unwrap();
        process.stdin.write_all(b"uci\n").unwrap();
        drop(process.stdin);

        let mut output = String::new();
        process.stdout.read_to_string(&mut output).unwrap();
        assert_eq!(output, "uci\n");
        assert!(process.child.wait().unwrap().success());
    }

    #[test]
    fn test_spawn_folds_stderr_into_stdout() {
        let mut process = spawn(Path::new("/bin/sh"), ["-c", "echo oops >&2"], 0).unwrap();
        let mut output = String::new();
        process.stdout.read_to_string(&mut output).unwrap();
        assert_eq!(output, "oops\n");
        process.child.wait().unwrap();
    }

    #[test]
    fn test_spawn_runs_in_own_process_group() {
        let mut process = spawn(Path::new("/bin/sh"), ["-c", "read -r line"], 0).unwrap();
        let pid = process.id();
        // SAFETY: getpgid only reads kernel state for a pid we still own.
        let pgid = unsafe { libc::getpgid(pid as libc::pid_t) };
        process.stdin.write_all(b"\n").unwrap();
        drop(process.stdin);
        process.child.wait().unwrap();
        assert_eq!(pgid, pid as libc::pid_t);
    }
}
