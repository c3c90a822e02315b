//! Running the external tools the build drivers stitch together.
//!
//! Commands are built as a program plus arguments, never as a shell string,
//! and run through a [`CommandRunner`] so that a driver can be exercised
//! without the tools installed.

use std::{
    fmt,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use log::{debug, info};

use crate::error::CiError;

/// An external command: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}
impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        ShellCommand {
            program: program.into(),
            args: vec![],
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }
        command
    }
}
impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dir) = &self.cwd {
            write!(f, "(cd {} && ", dir.display())?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        if self.cwd.is_some() {
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Runs external commands, blocking until they exit.
pub trait CommandRunner {
    /// Run with inherited standard streams; a non-zero exit is an error.
    fn run(&mut self, command: &ShellCommand) -> Result<(), CiError>;

    /// Run and capture the standard output; a non-zero exit is an error.
    fn output(&mut self, command: &ShellCommand) -> Result<String, CiError>;
}

/// Runs commands as child processes of this one.
#[derive(Debug, Default)]
pub struct SystemRunner;
impl CommandRunner for SystemRunner {
    fn run(&mut self, command: &ShellCommand) -> Result<(), CiError> {
        info!("running: {}", command);
        let status = command
            .to_command()
            .status()
            .map_err(|source| CiError::Spawn {
                command: command.to_string(),
                source,
            })?;
        debug!("{} -> {}", command.program(), status);
        if status.success() {
            Ok(())
        } else {
            Err(CiError::CommandFailed {
                command: command.to_string(),
                status,
            })
        }
    }

    fn output(&mut self, command: &ShellCommand) -> Result<String, CiError> {
        info!("running: {}", command);
        let output = command
            .to_command()
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| CiError::Spawn {
                command: command.to_string(),
                source,
            })?;
        debug!(
            "{} -> {} ({} bytes)",
            command.program(),
            output.status,
            output.stdout.len()
        );
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(CiError::CommandFailed {
                command: command.to_string(),
                status: output.status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_spaces() {
        let cmd = ShellCommand::new("python")
            .arg("tools/build.py")
            .args(vec!["-t", "GCC_ARM"])
            .arg("my project");
        assert_eq!(
            cmd.to_string(),
            "python tools/build.py -t GCC_ARM \"my project\""
        );
    }

    #[test]
    fn display_with_directory() {
        let cmd = ShellCommand::new("repo").arg("sync").current_dir("ws");
        assert_eq!(cmd.to_string(), "(cd ws && repo sync)");
        assert_eq!(cmd.cwd(), Some(Path::new("ws")));
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_reports_exit_status() {
        let mut runner = SystemRunner;
        assert!(runner.run(&ShellCommand::new("true")).is_ok());
        assert!(matches!(
            runner.run(&ShellCommand::new("false")),
            Err(CiError::CommandFailed { .. })
        ));
        assert_eq!(
            runner
                .output(&ShellCommand::new("echo").arg("hello"))
                .unwrap()
                .trim(),
            "hello"
        );
    }
}
