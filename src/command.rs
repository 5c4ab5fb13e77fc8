//src/command.rs

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::PipelineError;

/// A program plus its arguments, built up before it is handed to a runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for a in &self.args {
            write!(f, " {}", a.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Exit information of a finished subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    /// `None` if the process was terminated by a signal
    pub code: Option<i32>,
}

impl RunStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Seam between the pipeline and the operating system.
pub trait CommandRunner {
    /// Runs `invocation` to completion.
    ///
    /// With `log_path`, stdout and stderr both go to that file, which is
    /// truncated first. Without it, output is discarded. An `Err` means the
    /// process could not be started at all.
    fn run(&self, invocation: &Invocation, log_path: Option<&Path>) -> io::Result<RunStatus>;
}

/// Runs real processes through `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation, log_path: Option<&Path>) -> io::Result<RunStatus> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).stdin(Stdio::null());

        match log_path {
            Some(path) => {
                let log = File::create(path)?;
                cmd.stdout(Stdio::from(log.try_clone()?))
                    .stderr(Stdio::from(log));
            }
            None => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        log::debug!("Running: {invocation}");
        let status = cmd.status()?;
        Ok(RunStatus { code: status.code() })
    }
}

/// Checks that `program` can be launched by running `<program> version`.
pub fn check_tool<R: CommandRunner + ?Sized>(runner: &R, program: &OsStr) -> Result<(), PipelineError> {
    let invocation = Invocation::new(program).arg("version");
    let tool = program.to_string_lossy().into_owned();

    match runner.run(&invocation, None) {
        Ok(status) if status.success() => {
            log::info!("Found required tool: {tool}");
            Ok(())
        }
        Ok(status) => Err(PipelineError::MissingTool {
            tool,
            reason: format!("`{invocation}` exited with {:?}", status.code),
        }),
        Err(e) => Err(PipelineError::MissingTool {
            tool,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;

    type Handler = Box<dyn Fn(&Invocation, Option<&Path>) -> io::Result<RunStatus>>;

    /// In-memory runner: records every call and answers through a closure.
    pub struct ScriptedRunner {
        calls: RefCell<Vec<(Invocation, Option<PathBuf>)>>,
        handler: Handler,
    }

    impl ScriptedRunner {
        pub fn new<F>(handler: F) -> Self
        where
            F: Fn(&Invocation, Option<&Path>) -> io::Result<RunStatus> + 'static,
        {
            Self {
                calls: RefCell::new(Vec::new()),
                handler: Box::new(handler),
            }
        }

        pub fn calls(&self) -> Vec<(Invocation, Option<PathBuf>)> {
            self.calls.borrow().clone()
        }

        /// Calls whose first argument is `subcommand` (e.g. "quant").
        pub fn count(&self, subcommand: &str) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|(inv, _)| inv.args.first().map(|a| a == subcommand).unwrap_or(false))
                .count()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, invocation: &Invocation, log_path: Option<&Path>) -> io::Result<RunStatus> {
            self.calls
                .borrow_mut()
                .push((invocation.clone(), log_path.map(Path::to_path_buf)));
            (self.handler)(invocation, log_path)
        }
    }

    /// Value following `flag` in the argument list.
    pub fn value_of<'a>(invocation: &'a Invocation, flag: &str) -> Option<&'a OsStr> {
        let pos = invocation.args.iter().position(|a| a == flag)?;
        invocation.args.get(pos + 1).map(OsString::as_os_str)
    }

    pub fn exit(code: i32) -> io::Result<RunStatus> {
        Ok(RunStatus { code: Some(code) })
    }
}
