//! [`WindowManager`] implementation backed by `herbstclient`.
//!
//! Every call spawns `herbstclient -n <args>` and waits for it.  A crashed
//! herbstluftwm server can leave the client hanging, so each call is
//! bounded by a timeout after which the child is killed.

use crate::command::{parse_tag_status, Command, TagInfo};
use crate::config::ClientConfig;
use crate::traits::WindowManager;
use log::debug;
use std::io::Read;
use std::process::{Child, Command as Process, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// herbstluftwm-backed window manager.
pub struct HerbstClient {
    program: String,
    base_args: Vec<String>,
    timeout: Duration,
    delimiter: String,
}

/// Errors that can occur when talking to herbstluftwm.
#[derive(Debug, thiserror::Error)]
pub enum HerbstClientError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("{command} failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("io error while waiting for {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl Default for HerbstClient {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl HerbstClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            program: config.program.clone(),
            base_args: vec!["-n".into()],
            timeout: config.timeout(),
            delimiter: config.delimiter.clone(),
        }
    }

    /// Run the program with `args` and return its stdout.
    fn run(&self, args: &[String]) -> Result<String, HerbstClientError> {
        let command = format!("{} {}", self.program, args.join(" "));
        debug!("hc: {}", command);

        let mut child = Process::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| HerbstClientError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match wait_timeout(&mut child, self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(HerbstClientError::Timeout {
                    command,
                    timeout: self.timeout,
                });
            }
            Err(source) => return Err(HerbstClientError::Io { command, source }),
        };

        let out = stdout.join().unwrap_or_default();
        if !status.success() {
            let err = stderr.join().unwrap_or_default();
            return Err(HerbstClientError::Failed {
                command,
                status: status.to_string(),
                stderr: err.trim().to_string(),
            });
        }
        Ok(out)
    }

    /// Arguments for one `chain` call running `commands` in order.
    pub fn chain_args(&self, commands: &[Command]) -> Vec<String> {
        let mut args = vec!["chain".to_string()];
        for c in commands {
            args.push(self.delimiter.clone());
            args.extend(c.args());
        }
        args
    }
}

/// Read a child pipe to the end on a helper thread so a chatty child never
/// blocks on a full pipe while we wait for it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut p) = pipe {
            let _ = p.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn wait_timeout(
    child: &mut Child,
    timeout: Duration,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl WindowManager for HerbstClient {
    type Error = HerbstClientError;

    fn dump(&self, tag: &str) -> Result<String, Self::Error> {
        let out = self.run(&["dump".to_string(), tag.to_string()])?;
        Ok(out.trim().to_string())
    }

    fn tags(&self) -> Result<Vec<TagInfo>, Self::Error> {
        let out = self.run(&["tag_status".to_string()])?;
        Ok(parse_tag_status(&out))
    }

    fn call(&self, command: &Command) -> Result<String, Self::Error> {
        self.run(&command.args())
    }

    fn chain(&self, commands: &[Command]) -> Result<(), Self::Error> {
        if commands.is_empty() {
            return Ok(());
        }
        self.run(&self.chain_args(commands)).map(|_| ())
    }
}
