//! Command/reply framing on the hub serial line.
//!
//! The hub echoes every command, prints the reply lines and then its prompt:
//!
//! ```text
//! state 12\r\n
//! 12, 0000, R D O, 0, 0, x, 0.00\r\n
//! \r\n
//! >>
//! ```
//!
//! A reply is read until the prompt closes the buffer. Both the time spent
//! and the number of bytes accepted are bounded by the [`Settings`].

use std::{
    io::{self, Read, Write},
    time::{Duration, Instant},
};

use hexplay::HexViewBuilder;
use log::{debug, log_enabled, trace, Level::Debug};

use crate::{error::HubError, settings::Settings};

/// Prompt printed by the hub once it is ready for the next command.
pub const PROMPT: &str = ">>";

/// End-of-text, abandons whatever was typed on the hub command line.
const ETX: u8 = 0x03;

pub struct Transport<S> {
    stream: S,
    reply_deadline: Duration,
    reply_budget: usize,
}
impl<S: Read + Write> Transport<S> {
    pub fn new(stream: S, settings: &Settings) -> Self {
        Transport {
            stream,
            reply_deadline: settings.reply_deadline,
            reply_budget: settings.reply_budget,
        }
    }

    /// Clear any partial command left on the hub line and wait for a fresh
    /// prompt. Some hubs answer both the ETX and the carriage return with a
    /// prompt, so the line is drained until it goes quiet.
    pub fn reset(&mut self) -> Result<(), HubError> {
        self.stream.write_all(&[ETX, b'\r'])?;
        self.stream.flush()?;
        self.recv()?;
        self.drain()
    }

    /// Discard input until a read comes back empty or the reply deadline
    /// passes.
    fn drain(&mut self) -> Result<(), HubError> {
        let started = Instant::now();
        let mut chunk = [0u8; 256];
        let mut discarded = 0;

        while started.elapsed() <= self.reply_deadline {
            match self.stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(count) => discarded += count,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(ref e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::WouldBlock =>
                {
                    break
                }
                Err(e) => return Err(e.into()),
            }
        }
        if discarded > 0 {
            debug!("discarded {} bytes after reset", discarded);
        }
        Ok(())
    }

    /// Write `command` terminated by a carriage return.
    pub fn send(&mut self, command: &str) -> Result<(), HubError> {
        trace!("hub <- {:?}", command);
        self.stream.write_all(command.as_bytes())?;
        self.stream.write_all(b"\r")?;
        self.stream.flush()?;
        Ok(())
    }

    /// Read until the prompt, returning the raw text before it.
    pub fn recv(&mut self) -> Result<String, HubError> {
        let started = Instant::now();
        let mut reply: Vec<u8> = Vec::with_capacity(256);
        let mut chunk = [0u8; 256];

        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(HubError::NoPrompt {
                        elapsed_ms: started.elapsed().as_millis(),
                        received: reply.len(),
                    })
                }
                Ok(count) => {
                    reply.extend_from_slice(&chunk[..count]);
                    if ends_with_prompt(&reply) {
                        break;
                    }
                    if reply.len() > self.reply_budget {
                        return Err(HubError::ReplyTooLong {
                            budget: self.reply_budget,
                        });
                    }
                }
                Err(ref e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }

            if started.elapsed() > self.reply_deadline {
                return Err(HubError::NoPrompt {
                    elapsed_ms: started.elapsed().as_millis(),
                    received: reply.len(),
                });
            }
        }

        if log_enabled!(Debug) {
            let view = HexViewBuilder::new(&reply)
                .address_offset(0)
                .row_width(16)
                .finish();
            debug!("hub reply ({} bytes):\n{}", reply.len(), view);
        }

        let text = String::from_utf8_lossy(&reply);
        let body = text.trim_end();
        Ok(body.strip_suffix(PROMPT).unwrap_or(body).to_owned())
    }

    /// Send `command` and return the non-blank reply lines, without the
    /// command echo.
    pub fn transact(&mut self, command: &str) -> Result<Vec<String>, HubError> {
        self.send(command)?;
        let reply = self.recv()?;
        Ok(payload_lines(&reply, command))
    }

    /// Give the underlying stream back, closing the conversation.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

fn ends_with_prompt(reply: &[u8]) -> bool {
    let end = reply
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |p| p + 1);
    reply[..end].ends_with(PROMPT.as_bytes())
}

fn payload_lines(reply: &str, command: &str) -> Vec<String> {
    let mut echo_seen = false;
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            if !echo_seen && *line == command.trim() {
                echo_seen = true;
                false
            } else {
                true
            }
        })
        .map(str::to_owned)
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsBuilder;
    use std::io::Cursor;

    /// A duplex stream: reads from a canned reply, records what is written.
    struct Scripted {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }
    impl Scripted {
        fn new(reply: &str) -> Self {
            Scripted {
                input: Cursor::new(reply.as_bytes().to_vec()),
                output: vec![],
            }
        }
    }
    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            // Hand out a few bytes at a time, like a serial line does.
            let n = buf.len().min(7);
            self.input.read(&mut buf[..n])
        }
    }
    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn transport(reply: &str) -> Transport<Scripted> {
        Transport::new(Scripted::new(reply), &SettingsBuilder::new().finalize())
    }

    #[test]
    fn strips_echo_and_prompt() {
        let mut t = transport("state 12\r\n12, 0000, R D O, 0, 0, x, 0.00\r\n\r\n>> ");
        let lines = t.transact("state 12").unwrap();
        assert_eq!(lines, vec!["12, 0000, R D O, 0, 0, x, 0.00"]);
        assert_eq!(t.into_inner().output, b"state 12\r");
    }

    #[test]
    fn reply_without_echo() {
        let mut t = transport("1, 0000, O\r\n>>");
        assert_eq!(t.transact("state 1").unwrap(), vec!["1, 0000, O"]);
    }

    #[test]
    fn missing_prompt_is_an_error() {
        let mut t = transport("state 1\r\n1, 0000, O\r\n");
        assert!(matches!(
            t.transact("state 1"),
            Err(HubError::NoPrompt { .. })
        ));
    }

    #[test]
    fn reply_budget_is_enforced() {
        let long = "x".repeat(100);
        let mut t = Transport::new(
            Scripted::new(&long),
            &SettingsBuilder::new().reply_budget(32).finalize(),
        );
        assert!(matches!(
            t.recv(),
            Err(HubError::ReplyTooLong { budget: 32 })
        ));
    }

    #[test]
    fn reset_sends_etx() {
        let mut t = transport("\r\n>> ");
        t.reset().unwrap();
        assert_eq!(t.into_inner().output, vec![ETX, b'\r']);
    }

    #[test]
    fn reset_swallows_a_second_prompt() {
        let reply = "\r\n>> \r\n\r\n>> ";
        let mut t = transport(reply);
        t.reset().unwrap();
        assert_eq!(t.into_inner().input.position(), reply.len() as u64);
    }

    #[test]
    fn prompt_detection() {
        assert!(ends_with_prompt(b"abc\r\n>> "));
        assert!(ends_with_prompt(b">>"));
        assert!(!ends_with_prompt(b">> x"));
        assert!(!ends_with_prompt(b""));
    }
}
