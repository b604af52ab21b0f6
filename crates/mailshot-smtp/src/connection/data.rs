//! Message transparency for the DATA phase (RFC 5321 section 4.5.2).

/// Incremental encoder for message content sent after `DATA`.
///
/// Lines starting with `.` get an extra `.`, bare LF becomes CRLF, and
/// [`finish`](Self::finish) appends the terminating `.` line. State is kept
/// across calls so content can be fed in arbitrary chunks.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DotStuffer {
    at_line_start: bool,
    after_cr: bool,
}

impl Default for DotStuffer {
    fn default() -> Self {
        Self {
            at_line_start: true,
            after_cr: false,
        }
    }
}

impl DotStuffer {
    /// Appends the encoded form of `input` to `out`.
    pub(crate) fn encode(&mut self, input: &[u8], out: &mut Vec<u8>) {
        out.reserve(input.len() + 2);
        for &byte in input {
            if byte == b'\n' {
                if !self.after_cr {
                    out.push(b'\r');
                }
                out.push(b'\n');
                self.at_line_start = true;
                self.after_cr = false;
                continue;
            }

            if self.at_line_start && byte == b'.' {
                out.push(b'.');
            }
            out.push(byte);
            self.at_line_start = false;
            self.after_cr = byte == b'\r';
        }
    }

    /// Appends the end-of-data marker, completing an unterminated last line.
    pub(crate) fn finish(self, out: &mut Vec<u8>) {
        if !self.at_line_start {
            if self.after_cr {
                out.push(b'\n');
            } else {
                out.extend_from_slice(b"\r\n");
            }
        }
        out.extend_from_slice(b".\r\n");
    }
}
