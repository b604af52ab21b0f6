//! SMTP reply parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from its lines (CRLF already stripped).
///
/// - Single: `250 OK`
/// - Multi: `250-First line`, `250-Second line`, `250 Last line`
///
/// Every line must carry the same three-digit code.
///
/// # Errors
///
/// Returns an error if the reply is malformed.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some(first) = lines.first() else {
        return Err(Error::Protocol("Empty reply".into()));
    };

    let code = reply_code(first)?;
    let mut message = Vec::with_capacity(lines.len());

    for line in lines {
        if reply_code(line)? != code {
            return Err(Error::Protocol(format!(
                "Reply code changed inside multi-line reply: {line}"
            )));
        }
        match line.get(3..4) {
            None => message.push(String::new()),
            Some(" " | "-") => message.push(line[4..].to_string()),
            Some(_) => return Err(Error::Protocol(format!("Malformed reply line: {line}"))),
        }
    }

    Ok(Reply::new(code, message))
}

fn reply_code(line: &str) -> Result<ReplyCode> {
    let digits = line
        .get(..3)
        .filter(|d| d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| Error::Protocol(format!("Invalid reply code: {line}")))?;
    digits
        .parse::<u16>()
        .map(ReplyCode::new)
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {line}")))
}

/// Checks if a line is the last line of a reply.
///
/// Continuation lines use `-` after the code; the last line uses a space or
/// carries nothing but the code.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.len() == 3 || (line.len() >= 4 && line.as_bytes()[3] == b' ')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|l| (*l).to_string()).collect()
    }

    #[test]
    fn single_line_reply() {
        let reply = parse_reply(&lines(&["250 OK"])).unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(reply.message, vec!["OK"]);
    }

    #[test]
    fn ehlo_reply() {
        let reply = parse_reply(&lines(&[
            "250-smtp.example.com at your service",
            "250-STARTTLS",
            "250 AUTH PLAIN LOGIN",
        ]))
        .unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(
            reply.message,
            vec!["smtp.example.com at your service", "STARTTLS", "AUTH PLAIN LOGIN"]
        );
    }

    #[test]
    fn bare_code() {
        let reply = parse_reply(&lines(&["354"])).unwrap();
        assert_eq!(reply.code, ReplyCode::START_DATA);
        assert_eq!(reply.message, vec![String::new()]);
    }

    #[test]
    fn last_line_detection() {
        assert!(is_last_reply_line("250 OK"));
        assert!(is_last_reply_line("221"));
        assert!(!is_last_reply_line("250-PIPELINING"));
        assert!(!is_last_reply_line("25"));
    }

    #[test]
    fn rejects_malformed() {
        assert!(parse_reply(&[]).is_err());
        assert!(parse_reply(&lines(&["25"])).is_err());
        assert!(parse_reply(&lines(&["ABC OK"])).is_err());
        assert!(parse_reply(&lines(&["250_OK"])).is_err());
    }

    #[test]
    fn rejects_mixed_codes() {
        assert!(parse_reply(&lines(&["250-first", "550 second"])).is_err());
    }
}
