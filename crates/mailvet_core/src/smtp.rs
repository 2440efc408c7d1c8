//! SMTP probing over raw TCP
//!
//! One probe drives a minimal dialogue against a single mail exchanger:
//!
//! ```text
//! CONNECT -> 220 banner -> HELO -> 250 -> MAIL FROM -> 250 -> RCPT TO -> 250
//! ```
//!
//! Reply lines advance the dialogue only when they carry the echoed verb
//! (`250 ... HELO ...`, `250 ... MAIL ...`, `250 ... RCPT ...`); a server that
//! answers a bare `250 OK` stalls the dialogue until the probe deadline and
//! classifies as [`VerdictCategory::SmtpTimeout`] even when the mailbox is
//! fine. Error codes are classified from any state. A single wall-clock
//! deadline covers everything from connect to resolution, and every exit path
//! ends with a best-effort `QUIT` before the socket is dropped.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

use crate::{VerdictCategory, VerifierConfig};

/// How long cleanup may spend saying goodbye after a probe resolved.
const QUIT_GRACE: Duration = Duration::from_secs(2);

/// Resolution of one probe against one mail exchanger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub category: VerdictCategory,
    pub message: String,
}

impl ProbeOutcome {
    fn resolved(category: VerdictCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// Failures that never reach the SMTP conversation. The verifier skips to
/// the next MX host on these instead of recording a verdict.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },
}

/// SMTP prober for a fixed HELO identity and envelope sender
#[derive(Debug, Clone)]
pub struct SmtpProber {
    pub helo_name: String,
    pub mail_from: String,
    pub port: u16,
    pub timeout: Duration,
}

impl SmtpProber {
    pub fn from_config(config: &VerifierConfig) -> Self {
        Self {
            helo_name: config.helo_name.clone(),
            mail_from: config.mail_from.clone(),
            port: config.smtp_port,
            timeout: Duration::from_millis(config.smtp_timeout_ms),
        }
    }

    /// Run one probe for `address` against the exchanger `host`.
    ///
    /// Exactly one resolution per probe; whatever the server sends after the
    /// dialogue resolved is discarded along with the socket.
    pub async fn probe(&self, host: &str, address: &str) -> Result<ProbeOutcome, ProbeError> {
        let deadline = Instant::now() + self.timeout;
        let target = format!("{}:{}", host, self.port);

        let mut candidates = match timeout_at(deadline, lookup_host(target)).await {
            Ok(Ok(addrs)) => addrs,
            Ok(Err(err)) => {
                return Err(ProbeError::Resolve {
                    host: host.to_string(),
                    source: err,
                })
            }
            Err(_) => return Ok(self.timed_out(host)),
        };
        let Some(addr) = candidates.next() else {
            return Err(ProbeError::Resolve {
                host: host.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "hostname resolved to no addresses",
                ),
            });
        };

        debug!(%host, %addr, "probing mail exchanger");

        let mut stream = match timeout_at(deadline, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                return Ok(ProbeOutcome::resolved(
                    VerdictCategory::ConnectionError,
                    format!("connection to {host} failed: {err}"),
                ))
            }
            Err(_) => return Ok(self.timed_out(host)),
        };

        let outcome = match timeout_at(deadline, self.converse(&mut stream, host, address)).await {
            Ok(outcome) => outcome,
            Err(_) => self.timed_out(host),
        };

        hang_up(stream).await;
        Ok(outcome)
    }

    /// Drive the dialogue to its single resolution. Transport failures
    /// resolve as `connection_error`; lines that neither advance the state
    /// nor carry a classified code are ignored and the deadline handles the
    /// stall.
    async fn converse(&self, stream: &mut TcpStream, host: &str, address: &str) -> ProbeOutcome {
        let mut state = DialogueState::AwaitBanner;
        let mut buffer: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            let read = match stream.read(&mut chunk).await {
                Ok(0) => {
                    return ProbeOutcome::resolved(
                        VerdictCategory::ConnectionError,
                        format!("{host} closed the connection"),
                    )
                }
                Ok(n) => n,
                Err(err) => {
                    return ProbeOutcome::resolved(
                        VerdictCategory::ConnectionError,
                        format!("socket error from {host}: {err}"),
                    )
                }
            };
            buffer.extend_from_slice(&chunk[..read]);

            for line in drain_complete_lines(&mut buffer) {
                trace!(%host, %line, "server reply");

                let command = match (state, line.as_str()) {
                    (DialogueState::AwaitBanner, l) if l.starts_with("220") => {
                        state = DialogueState::AwaitHeloReply;
                        Some(format!("HELO {}\r\n", self.helo_name))
                    }
                    (DialogueState::AwaitHeloReply, l)
                        if l.starts_with("250") && l.contains("HELO") =>
                    {
                        state = DialogueState::AwaitMailReply;
                        Some(format!("MAIL FROM: <{}>\r\n", self.mail_from))
                    }
                    (DialogueState::AwaitMailReply, l)
                        if l.starts_with("250") && l.contains("MAIL") =>
                    {
                        state = DialogueState::AwaitRcptReply;
                        Some(format!("RCPT TO: <{address}>\r\n"))
                    }
                    (DialogueState::AwaitRcptReply, l)
                        if l.starts_with("250") && l.contains("RCPT") =>
                    {
                        return ProbeOutcome::resolved(
                            VerdictCategory::Valid,
                            format!("recipient accepted by {host}"),
                        );
                    }
                    _ => None,
                };

                if let Some(command) = command {
                    if let Err(err) = stream.write_all(command.as_bytes()).await {
                        return ProbeOutcome::resolved(
                            VerdictCategory::ConnectionError,
                            format!("write to {host} failed: {err}"),
                        );
                    }
                    continue;
                }

                match status_code(&line) {
                    Some(550) | Some(551) => {
                        return ProbeOutcome::resolved(
                            VerdictCategory::NotExisting,
                            format!("mailbox does not exist: {line}"),
                        )
                    }
                    Some(552) | Some(553) => {
                        return ProbeOutcome::resolved(
                            VerdictCategory::MailboxError,
                            format!("mailbox error: {line}"),
                        )
                    }
                    Some(421) | Some(450) => {
                        return ProbeOutcome::resolved(
                            VerdictCategory::TemporaryError,
                            format!("temporary failure: {line}"),
                        )
                    }
                    Some(code) if (500..=599).contains(&code) => {
                        return ProbeOutcome::resolved(
                            VerdictCategory::SmtpError,
                            format!("SMTP error from {host}: {line}"),
                        )
                    }
                    _ => {}
                }
            }
        }
    }

    fn timed_out(&self, host: &str) -> ProbeOutcome {
        ProbeOutcome::resolved(
            VerdictCategory::SmtpTimeout,
            format!(
                "no decisive reply from {host} within {}ms",
                self.timeout.as_millis()
            ),
        )
    }
}

/// Dialogue states progress strictly forward; there is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogueState {
    AwaitBanner,
    AwaitHeloReply,
    AwaitMailReply,
    AwaitRcptReply,
}

/// Pull every CRLF-terminated line out of `buffer`, leaving the trailing
/// unterminated fragment for the next read.
fn drain_complete_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.windows(2).position(|window| window == b"\r\n") {
        let raw: Vec<u8> = buffer.drain(..pos + 2).collect();
        lines.push(String::from_utf8_lossy(&raw[..raw.len() - 2]).into_owned());
    }
    lines
}

/// Status code parsed from the first three characters of a reply line.
fn status_code(line: &str) -> Option<u16> {
    line.get(..3)?.parse().ok()
}

/// Best-effort goodbye after resolution; failures here are expected when the
/// peer is already gone and are suppressed.
async fn hang_up(mut stream: TcpStream) {
    let goodbye = async {
        stream.write_all(b"QUIT\r\n").await?;
        stream.shutdown().await
    };
    if let Ok(Err(err)) = tokio::time::timeout(QUIT_GRACE, goodbye).await {
        trace!(error = %err, "cleanup after probe failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    fn prober_for(addr: SocketAddr, timeout_ms: u64) -> SmtpProber {
        SmtpProber {
            helo_name: "email-validator.com".to_string(),
            mail_from: "check@email-validator.com".to_string(),
            port: addr.port(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Scripted mail exchanger: sends `banner`, then for each step asserts
    /// the client line starts with the expected verb and answers the reply.
    async fn scripted_server(
        banner: &'static str,
        steps: Vec<(&'static str, &'static str)>,
    ) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);
            if !banner.is_empty() {
                reader.get_mut().write_all(banner.as_bytes()).await.unwrap();
            }
            let mut line = String::new();
            for (expect, reply) in steps {
                line.clear();
                if reader.read_line(&mut line).await.unwrap() == 0 {
                    return;
                }
                assert!(
                    line.starts_with(expect),
                    "expected a {expect} command, got {line:?}"
                );
                reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
            }
            // absorb the trailing QUIT, if any, then drop the socket
            line.clear();
            let _ = reader.read_line(&mut line).await;
        });
        addr
    }

    #[tokio::test]
    async fn test_full_dialogue_resolves_valid() {
        let addr = scripted_server(
            "220 mx.test ESMTP\r\n",
            vec![
                ("HELO", "250 mx.test HELO ok\r\n"),
                ("MAIL", "250 2.1.0 MAIL ok\r\n"),
                ("RCPT", "250 2.1.5 RCPT ok\r\n"),
            ],
        )
        .await;

        let outcome = prober_for(addr, 2_000)
            .probe("127.0.0.1", "a@ex.com")
            .await
            .unwrap();
        assert_eq!(outcome.category, VerdictCategory::Valid);
    }

    #[tokio::test]
    async fn test_550_after_rcpt_is_not_existing() {
        let addr = scripted_server(
            "220 mx.test ESMTP\r\n",
            vec![
                ("HELO", "250 mx.test HELO ok\r\n"),
                ("MAIL", "250 MAIL ok\r\n"),
                ("RCPT", "550 5.1.1 User unknown\r\n"),
            ],
        )
        .await;

        let outcome = prober_for(addr, 2_000)
            .probe("127.0.0.1", "nobody@ex.com")
            .await
            .unwrap();
        assert_eq!(outcome.category, VerdictCategory::NotExisting);
        assert!(outcome.message.contains("User unknown"));
    }

    #[tokio::test]
    async fn test_552_is_mailbox_error() {
        let addr = scripted_server("552 mailbox full\r\n", vec![]).await;

        let outcome = prober_for(addr, 2_000)
            .probe("127.0.0.1", "a@ex.com")
            .await
            .unwrap();
        assert_eq!(outcome.category, VerdictCategory::MailboxError);
    }

    #[tokio::test]
    async fn test_421_is_temporary_error() {
        let addr = scripted_server("421 4.7.0 try again later\r\n", vec![]).await;

        let outcome = prober_for(addr, 2_000)
            .probe("127.0.0.1", "a@ex.com")
            .await
            .unwrap();
        assert_eq!(outcome.category, VerdictCategory::TemporaryError);
    }

    #[tokio::test]
    async fn test_other_5xx_is_smtp_error_with_line_attached() {
        let addr = scripted_server("554 5.7.1 no service for you\r\n", vec![]).await;

        let outcome = prober_for(addr, 2_000)
            .probe("127.0.0.1", "a@ex.com")
            .await
            .unwrap();
        assert_eq!(outcome.category, VerdictCategory::SmtpError);
        assert!(outcome.message.contains("554 5.7.1 no service for you"));
    }

    #[tokio::test]
    async fn test_banner_then_close_is_connection_error() {
        let addr = scripted_server("220 mx.test ESMTP\r\n", vec![]).await;

        // The script ends after the banner and one read, so the socket drops
        // while the prober waits for its HELO reply.
        let outcome = prober_for(addr, 2_000)
            .probe("127.0.0.1", "a@ex.com")
            .await
            .unwrap();
        assert_eq!(outcome.category, VerdictCategory::ConnectionError);
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let outcome = prober_for(addr, 150)
            .probe("127.0.0.1", "a@ex.com")
            .await
            .unwrap();
        assert_eq!(outcome.category, VerdictCategory::SmtpTimeout);
    }

    #[tokio::test]
    async fn test_bare_250_without_verb_stalls_to_timeout() {
        // Known limitation: a 250 reply without the echoed verb never
        // advances the dialogue.
        let addr = scripted_server(
            "220 mx.test ESMTP\r\n",
            vec![("HELO", "250 OK\r\n")],
        )
        .await;

        let outcome = prober_for(addr, 200)
            .probe("127.0.0.1", "a@ex.com")
            .await
            .unwrap();
        assert_eq!(outcome.category, VerdictCategory::SmtpTimeout);
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_error() {
        // Bind then drop to find a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = prober_for(addr, 2_000)
            .probe("127.0.0.1", "a@ex.com")
            .await
            .unwrap();
        assert_eq!(outcome.category, VerdictCategory::ConnectionError);
    }

    #[test]
    fn test_drain_complete_lines_keeps_fragment() {
        let mut buffer = b"220 one\r\n250 tw".to_vec();
        let lines = drain_complete_lines(&mut buffer);
        assert_eq!(lines, vec!["220 one"]);
        assert_eq!(buffer, b"250 tw");

        buffer.extend_from_slice(b"o\r\n");
        let lines = drain_complete_lines(&mut buffer);
        assert_eq!(lines, vec!["250 two"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_status_code_parsing() {
        assert_eq!(status_code("250 2.1.0 Sender OK"), Some(250));
        assert_eq!(status_code("550-multiline"), Some(550));
        assert_eq!(status_code("ok"), None);
        assert_eq!(status_code("abc def"), None);
    }
}
