//! Blocking external process runner.
//!
//! Every media operation goes through [`ToolRunner`]: the command line is
//! logged, output lines feed the job logger's tail buffer, and a non-zero
//! exit becomes [`MediaError::CommandFailed`] carrying the last lines of output.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use crate::logging::JobLogger;

use super::error::{MediaError, MediaResult};

/// Default number of output lines kept for failures.
pub const DEFAULT_TAIL_LINES: usize = 200;

/// Runs external tools synchronously with output capture.
#[derive(Clone)]
pub struct ToolRunner {
    logger: Option<Arc<JobLogger>>,
    tail_lines: usize,
    log_json: bool,
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TAIL_LINES)
    }
}

impl ToolRunner {
    pub fn new(tail_lines: usize) -> Self {
        Self {
            logger: None,
            tail_lines,
            log_json: false,
        }
    }

    /// Mirror commands and output into a job log.
    pub fn with_logger(mut self, logger: Arc<JobLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Also log each argument list as JSON.
    pub fn log_json(mut self, enabled: bool) -> Self {
        self.log_json = enabled;
        self
    }

    /// Run a tool and return its stdout as text.
    pub fn run(&self, tool: &str, args: &[String]) -> MediaResult<String> {
        let stdout = self.execute(tool, args, None, true)?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    /// Run a tool with optional binary stdin, returning raw stdout.
    ///
    /// Stdin is written on a scoped thread while stdout and stderr are
    /// drained, so large PCM payloads cannot deadlock on full pipes.
    pub fn run_piped(
        &self,
        tool: &str,
        args: &[String],
        input: Option<&[u8]>,
    ) -> MediaResult<Vec<u8>> {
        self.execute(tool, args, input, false)
    }

    fn execute(
        &self,
        tool: &str,
        args: &[String],
        input: Option<&[u8]>,
        stdout_is_text: bool,
    ) -> MediaResult<Vec<u8>> {
        if let Some(logger) = &self.logger {
            logger.command(&format!("{} {}", tool, args.join(" ")));
            if self.log_json {
                logger.command_json(args);
            }
            logger.clear_tail();
        }
        tracing::debug!("Running {} {:?}", tool, args);

        let mut cmd = Command::new(tool);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                MediaError::ToolNotFound {
                    tool: tool.to_string(),
                }
            } else {
                MediaError::Spawn {
                    tool: tool.to_string(),
                    source: e,
                }
            }
        })?;

        let stdin = child.stdin.take();
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::io("capturing stdout", broken_pipe(tool)))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::io("capturing stderr", broken_pipe(tool)))?;

        let (read_result, stderr_buf, write_result) = thread::scope(|scope| {
            let writer = scope.spawn(move || -> io::Result<()> {
                if let (Some(mut pipe), Some(data)) = (stdin, input) {
                    pipe.write_all(data)?;
                }
                Ok(())
            });
            let err_reader = scope.spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                buf
            });

            let mut out = Vec::new();
            let read_result = stdout.read_to_end(&mut out).map(|_| out);
            let write_result = writer.join().unwrap_or_else(|_| Err(broken_pipe(tool)));
            let stderr_buf = err_reader.join().unwrap_or_default();
            (read_result, stderr_buf, write_result)
        });

        let status = child
            .wait()
            .map_err(|e| MediaError::io(format!("waiting for {}", tool), e))?;

        let stdout_buf = read_result.map_err(|e| MediaError::io("reading stdout", e))?;

        let mut tail: VecDeque<String> = VecDeque::with_capacity(self.tail_lines.min(1024));
        let mut push_line = |line: &str, is_stderr: bool| {
            if let Some(logger) = &self.logger {
                logger.output_line(line, is_stderr);
            }
            if self.tail_lines == 0 {
                return;
            }
            if tail.len() >= self.tail_lines {
                tail.pop_front();
            }
            tail.push_back(line.to_string());
        };

        if stdout_is_text {
            for line in String::from_utf8_lossy(&stdout_buf).lines() {
                push_line(line, false);
            }
        }
        for line in String::from_utf8_lossy(&stderr_buf).lines() {
            push_line(line, true);
        }

        if !status.success() {
            let exit_code = status.code().unwrap_or(-1);
            if let Some(logger) = &self.logger {
                logger.show_tail(&format!("{} output", tool));
            }
            return Err(MediaError::command_failed(
                tool,
                exit_code,
                tail.into_iter().collect(),
            ));
        }

        write_result.map_err(|e| MediaError::io(format!("writing {} stdin", tool), e))?;

        Ok(stdout_buf)
    }
}

fn broken_pipe(tool: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::BrokenPipe,
        format!("{} pipe unavailable", tool),
    )
}

/// Resolve a binary on PATH.
pub fn require_tool(name: &str) -> MediaResult<PathBuf> {
    which::which(name).map_err(|_| MediaError::ToolNotFound {
        tool: name.to_string(),
    })
}
