//! End-to-end sends against a fake SMTP server on a loopback socket.

#![allow(clippy::unwrap_used)]

use clap::Parser;
use mailshot::{Cli, Config, Error, SessionState, Settings, Warning, deliver, normalize_args};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};

/// How the fake server behaves.
#[derive(Default)]
struct Behavior {
    /// EHLO keywords after the greeting line.
    extensions: &'static [&'static str],
    /// Recipients answered with 550.
    reject: &'static [&'static str],
    /// Answer MAIL FROM with 550.
    reject_sender: bool,
    /// Answer the end of message content with 554.
    reject_content: bool,
}

/// What the fake server saw.
#[derive(Debug, Default)]
struct Transcript {
    commands: Vec<String>,
    content: Vec<String>,
}

async fn fake_server(behavior: Behavior) -> (u16, JoinHandle<Transcript>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();
        let mut transcript = Transcript::default();

        write.write_all(b"220 fake.test ESMTP\r\n").await.unwrap();

        while let Some(line) = lines.next_line().await.unwrap() {
            transcript.commands.push(line.clone());
            let upper = line.to_ascii_uppercase();

            let reply = if upper.starts_with("EHLO") {
                let mut reply = String::from("250");
                for keyword in std::iter::once(&"fake.test").chain(behavior.extensions) {
                    reply.push_str(&format!("-{keyword}\r\n250"));
                }
                reply.push_str(" HELP");
                reply
            } else if upper.starts_with("AUTH") {
                "235 Authenticated".to_string()
            } else if upper.starts_with("MAIL FROM:") {
                if behavior.reject_sender {
                    "550 Sender denied".to_string()
                } else {
                    "250 OK".to_string()
                }
            } else if let Some(rcpt) = upper.strip_prefix("RCPT TO:") {
                let rejected = behavior
                    .reject
                    .iter()
                    .any(|r| rcpt == format!("<{}>", r.to_ascii_uppercase()));
                if rejected {
                    "550 No such user".to_string()
                } else {
                    "250 OK".to_string()
                }
            } else if upper == "DATA" {
                write.write_all(b"354 Go ahead\r\n").await.unwrap();
                loop {
                    let line = lines.next_line().await.unwrap().unwrap();
                    if line == "." {
                        break;
                    }
                    transcript.content.push(line);
                }
                if behavior.reject_content {
                    "554 Message rejected as spam".to_string()
                } else {
                    "250 Queued".to_string()
                }
            } else if upper == "QUIT" {
                write.write_all(b"221 Bye\r\n").await.unwrap();
                break;
            } else {
                "502 Not implemented".to_string()
            };
            write.write_all(format!("{reply}\r\n").as_bytes()).await.unwrap();
        }
        transcript
    });

    (port, handle)
}

fn config_with_env<F>(port: u16, args: &[&str], env: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let server = format!("-s=127.0.0.1:{port}");
    let mut argv = vec!["mailshot", server.as_str()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(normalize_args(argv)).unwrap();
    Config::build(&cli, &Settings::default(), env).unwrap()
}

fn config(port: u16, args: &[&str]) -> Config {
    config_with_env(port, args, |_| None)
}

#[tokio::test]
async fn sends_headers_and_body_to_each_recipient() {
    let (port, handle) = fake_server(Behavior::default()).await;
    let config = config(
        port,
        &["-f=a@x.com", "-t=b@x.com,c@x.com", "-u=Hi", "-m=Hello"],
    );

    let delivery = assert_ok!(deliver(&config, tokio::io::empty()).await);
    assert_eq!(delivery.recipients.len(), 2);
    assert!(!delivery.authenticated);
    assert!(!delivery.tls);
    assert_eq!(delivery.body_bytes, 5);
    assert_eq!(delivery.warnings, vec![Warning::TlsUnavailable]);

    let transcript = handle.await.unwrap();
    assert_eq!(
        transcript.commands,
        vec![
            "EHLO localhost",
            "MAIL FROM:<a@x.com>",
            "RCPT TO:<b@x.com>",
            "RCPT TO:<c@x.com>",
            "DATA",
            "QUIT",
        ]
    );
    assert_eq!(
        transcript.content,
        vec![
            "From: a@x.com",
            "To: b@x.com",
            "To: c@x.com",
            "Subject: Hi",
            "",
            "Hello",
        ]
    );
}

#[tokio::test]
async fn bcc_gets_an_envelope_but_no_header() {
    let (port, handle) = fake_server(Behavior::default()).await;
    let config = config(
        port,
        &["-f=a@x.com", "-t=b@x.com", "-cc=c@x.com", "-bcc=hidden@y.org", "-l=false", "-m=Hi"],
    );

    assert_ok!(deliver(&config, tokio::io::empty()).await);

    let transcript = handle.await.unwrap();
    assert!(transcript.commands.contains(&"RCPT TO:<hidden@y.org>".to_string()));
    assert!(transcript.content.contains(&"CC: c@x.com".to_string()));
    assert!(!transcript.content.iter().any(|line| line.contains("hidden@y.org")));
}

#[tokio::test]
async fn body_from_reader_is_dot_stuffed() {
    let (port, handle) = fake_server(Behavior::default()).await;
    let config = config(port, &["-f=a@x.com", "-t=b@x.com", "-l=false"]);

    let body: &[u8] = b"line one\n.hidden\n";
    let delivery = assert_ok!(deliver(&config, body).await);
    assert_eq!(delivery.body_bytes, 17);

    let transcript = handle.await.unwrap();
    assert_eq!(
        transcript.content,
        vec!["From: a@x.com", "To: b@x.com", "", "line one", "..hidden"]
    );
}

#[tokio::test]
async fn authenticates_with_plain_on_loopback() {
    let (port, handle) = fake_server(Behavior {
        extensions: &["AUTH PLAIN LOGIN", "8BITMIME"],
        ..Behavior::default()
    })
    .await;
    let config = config_with_env(
        port,
        &["-f=a@x.com", "-t=b@x.com", "-l=false", "-m=Hi", "-xu=user"],
        |key| (key == "MAILSHOT_PASS").then(|| "pass".to_string()),
    );

    let delivery = assert_ok!(deliver(&config, tokio::io::empty()).await);
    assert!(delivery.authenticated);
    assert!(delivery.warnings.is_empty());

    let transcript = handle.await.unwrap();
    assert_eq!(transcript.commands[1], "AUTH PLAIN AHVzZXIAcGFzcw==");
}

#[tokio::test]
async fn credentials_without_server_auth_only_warn() {
    let (port, handle) = fake_server(Behavior::default()).await;
    let config = config(
        port,
        &["-f=a@x.com", "-t=b@x.com", "-l=false", "-m=Hi", "-xu=user", "-xp=pass"],
    );

    let delivery = assert_ok!(deliver(&config, tokio::io::empty()).await);
    assert!(!delivery.authenticated);
    assert_eq!(delivery.warnings, vec![Warning::CredentialsUnused]);

    let transcript = handle.await.unwrap();
    assert!(!transcript.commands.iter().any(|c| c.starts_with("AUTH")));
    assert_eq!(transcript.commands.last().map(String::as_str), Some("QUIT"));
}

#[tokio::test]
async fn server_auth_without_credentials_only_warns() {
    let (port, handle) = fake_server(Behavior {
        extensions: &["AUTH PLAIN"],
        ..Behavior::default()
    })
    .await;
    let config = config(port, &["-f=a@x.com", "-t=b@x.com", "-l=false", "-m=Hi"]);

    let delivery = assert_ok!(deliver(&config, tokio::io::empty()).await);
    assert_eq!(delivery.warnings, vec![Warning::NoCredentials]);

    let transcript = handle.await.unwrap();
    assert!(!transcript.commands.iter().any(|c| c.starts_with("AUTH")));
}

#[tokio::test]
async fn auth_disabled_skips_authentication() {
    let (port, handle) = fake_server(Behavior {
        extensions: &["AUTH PLAIN"],
        ..Behavior::default()
    })
    .await;
    let config = config(
        port,
        &["-f=a@x.com", "-t=b@x.com", "-l=false", "-a=false", "-m=Hi", "-xu=u", "-xp=p"],
    );

    let delivery = assert_ok!(deliver(&config, tokio::io::empty()).await);
    assert!(!delivery.authenticated);
    assert!(delivery.warnings.is_empty());

    let transcript = handle.await.unwrap();
    assert!(!transcript.commands.iter().any(|c| c.starts_with("AUTH")));
}

#[tokio::test]
async fn rejected_recipient_aborts_and_quits() {
    let (port, handle) = fake_server(Behavior {
        reject: &["c@x.com"],
        ..Behavior::default()
    })
    .await;
    let config = config(port, &["-f=a@x.com", "-t=b@x.com,c@x.com", "-l=false", "-m=Hi"]);

    let err = assert_err!(deliver(&config, tokio::io::empty()).await);
    assert!(matches!(
        err,
        Error::Protocol {
            state: SessionState::RecipientsSet,
            ..
        }
    ));
    assert_eq!(err.to_string(), "error specifying recipient: SMTP error 550: No such user");

    let transcript = handle.await.unwrap();
    assert!(!transcript.commands.contains(&"DATA".to_string()));
    assert_eq!(transcript.commands.last().map(String::as_str), Some("QUIT"));
}

#[tokio::test]
async fn rejected_sender_aborts_and_quits() {
    let (port, handle) = fake_server(Behavior {
        reject_sender: true,
        ..Behavior::default()
    })
    .await;
    let config = config(port, &["-f=a@x.com", "-t=b@x.com", "-l=false", "-m=Hi"]);

    let err = assert_err!(deliver(&config, tokio::io::empty()).await);
    assert!(matches!(
        err,
        Error::Protocol {
            state: SessionState::SenderSet,
            ..
        }
    ));
    assert_eq!(err.to_string(), "error specifying mail from: SMTP error 550: Sender denied");

    let transcript = handle.await.unwrap();
    assert_eq!(
        transcript.commands,
        vec!["EHLO localhost", "MAIL FROM:<a@x.com>", "QUIT"]
    );
}

#[tokio::test]
async fn rejected_content_aborts_and_quits() {
    let (port, handle) = fake_server(Behavior {
        reject_content: true,
        ..Behavior::default()
    })
    .await;
    let config = config(port, &["-f=a@x.com", "-t=b@x.com", "-l=false", "-m=Hi"]);

    let err = assert_err!(deliver(&config, tokio::io::empty()).await);
    assert!(matches!(
        err,
        Error::Protocol {
            state: SessionState::DataWritten,
            ..
        }
    ));
    assert_eq!(
        err.to_string(),
        "error outputting data: SMTP error 554: Message rejected as spam"
    );

    let transcript = handle.await.unwrap();
    assert_eq!(transcript.content.last().map(String::as_str), Some("Hi"));
    assert_eq!(
        transcript.commands,
        vec![
            "EHLO localhost",
            "MAIL FROM:<a@x.com>",
            "RCPT TO:<b@x.com>",
            "DATA",
            "QUIT"
        ]
    );
}

#[tokio::test]
async fn whitespace_message_is_sent_inline() {
    let (port, handle) = fake_server(Behavior::default()).await;
    let config = config(port, &["-f=a@x.com", "-t=b@x.com", "-l=false", "-m=  "]);

    let body: &[u8] = b"from stdin\n";
    let delivery = assert_ok!(deliver(&config, body).await);
    assert_eq!(delivery.body_bytes, 2);

    let transcript = handle.await.unwrap();
    assert_eq!(transcript.content.last().map(String::as_str), Some("  "));
}

#[tokio::test]
async fn no_recipients_fails_before_connecting() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let mut config = config(port, &["-f=a@x.com", "-t=b@x.com"]);
    config.to.clear();

    let err = assert_err!(deliver(&config, tokio::io::empty()).await);
    assert!(err.is_usage());

    let accepted = tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
    assert!(accepted.is_err(), "no connection expected");
}

#[tokio::test]
async fn unreachable_server_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = config(port, &["-f=a@x.com", "-t=b@x.com", "-m=Hi"]);
    let err = assert_err!(deliver(&config, tokio::io::empty()).await);
    assert!(matches!(err, Error::Connect { .. }));
    assert!(err.to_string().starts_with(&format!("error connecting to 127.0.0.1:{port}")));
}
