//! External pipe: programmatic stdin feed for one-shot commands
//! (pipe the selection through a pager, a formatter, a notifier).
//!
//! The child owns its stdin fd; the payload is written, the fd is
//! closed, and the child is left to run. Nothing waits on it.

use core_module::{Module, PipeData};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

#[derive(Default)]
pub struct PipeModule;

impl PipeModule {
    pub fn new() -> PipeModule {
        PipeModule
    }
}

impl Module for PipeModule {
    fn name(&self) -> &'static str {
        "pipe"
    }

    fn as_pipe(&mut self) -> Option<&mut dyn PipeData> {
        Some(self)
    }
}

impl PipeData for PipeModule {
    fn pipe_data(&mut self, command: &str, bytes: &[u8]) -> anyhow::Result<()> {
        debug!(target: "module.pipe", command, len = bytes.len(), "piping");
        let mut child = Command::new("/bin/sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take()
            && let Err(err) = stdin.write_all(bytes)
        {
            // A closed pipe just means the command did not want the
            // data; the dispatch still succeeded.
            warn!(target: "module.pipe", command, %err, "command closed stdin early");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn pipes_payload_to_command() {
        let dir = std::env::temp_dir().join(format!("oxterm-pipe-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let out = dir.join("out.txt");
        let mut m = PipeModule::new();
        m.pipe_data(&format!("cat > {}", out.display()), b"payload\n")
            .unwrap();
        // fire-and-forget: poll briefly for the child to finish
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Ok(content) = std::fs::read(&out)
                && content == b"payload\n"
            {
                break;
            }
            assert!(Instant::now() < deadline, "child never wrote output");
            std::thread::sleep(Duration::from_millis(10));
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_shell_command_fails_gracefully() {
        let mut m = PipeModule::new();
        // the shell exists, the command inside does not; stdin write
        // may hit a closed pipe but the call still returns Ok
        assert!(m.pipe_data("/nonexistent-cmd-xyz", b"data").is_ok());
    }
}
