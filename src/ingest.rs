//! Online input ingester.
//!
//! A non-blocking, line-buffered reader over stdin, toggling `O_NONBLOCK`
//! around each read. `drain()` is called before every scheduling decision
//! and while sleeping through a quantum; `block_until_input()` is used only
//! when the engine is otherwise idle.

use tracing::debug;

const READ_BUF_SIZE: usize = 4096;

pub struct Ingester {
    leftover: Vec<u8>,
    closed: bool,
}

impl Ingester {
    pub fn new() -> Self {
        Ingester {
            leftover: Vec::new(),
            closed: false,
        }
    }

    /// Whether stdin has reached EOF. The engine keeps processing existing
    /// tasks after this; it only affects whether the engine may still block
    /// waiting for more input.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Read whatever is available right now (non-blocking) and return any
    /// complete lines. `WouldBlock` and EOF both terminate the read without
    /// error, per spec.
    pub fn drain(&mut self) -> Vec<String> {
        self.read_once(true)
    }

    /// Block until stdin has at least one byte to offer (or is closed), then
    /// return any complete lines extracted from it.
    pub fn block_until_input(&mut self) -> Vec<String> {
        self.read_once(false)
    }

    fn read_once(&mut self, nonblocking: bool) -> Vec<String> {
        set_stdin_nonblocking(nonblocking);
        let mut buf = [0u8; READ_BUF_SIZE];
        // SAFETY: STDIN_FILENO is a valid, open fd for the process lifetime;
        // buf is sized and owned for the duration of the call.
        let n = unsafe {
            libc::read(
                libc::STDIN_FILENO,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
            )
        };
        if n > 0 {
            self.leftover.extend_from_slice(&buf[..n as usize]);
        } else if n == 0 {
            self.closed = true;
        }
        self.extract_lines()
    }

    fn extract_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(pos) = self.leftover.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.leftover.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if !trimmed.is_empty() {
                debug!(line = %trimmed, "ingested command line");
                lines.push(trimmed.to_string());
            }
        }
        lines
    }
}

impl Default for Ingester {
    fn default() -> Self {
        Self::new()
    }
}

fn set_stdin_nonblocking(enable: bool) {
    // SAFETY: fcntl on a valid fd with F_GETFL/F_SETFL is always safe to call.
    unsafe {
        let flags = libc::fcntl(libc::STDIN_FILENO, libc::F_GETFL, 0);
        if flags == -1 {
            return;
        }
        let new_flags = if enable {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };
        libc::fcntl(libc::STDIN_FILENO, libc::F_SETFL, new_flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_lines_strips_crlf_and_skips_empty() {
        let mut ing = Ingester::new();
        ing.leftover
            .extend_from_slice(b"/bin/echo a\r\n\n/bin/echo b\n");
        let lines = ing.extract_lines();
        assert_eq!(lines, vec!["/bin/echo a", "/bin/echo b"]);
    }

    #[test]
    fn partial_trailing_line_is_preserved() {
        let mut ing = Ingester::new();
        ing.leftover.extend_from_slice(b"/bin/echo a\n/bin/echo par");
        let lines = ing.extract_lines();
        assert_eq!(lines, vec!["/bin/echo a"]);
        assert_eq!(ing.leftover, b"/bin/echo par");
    }

    #[test]
    fn not_closed_initially() {
        let ing = Ingester::new();
        assert!(!ing.is_closed());
    }
}
