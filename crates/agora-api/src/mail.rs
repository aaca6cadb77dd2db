use tracing::{info, trace};

/// Outbound delivery of password-reset links.
pub trait Mailer: Send + Sync {
    fn send_password_reset(&self, to: &str, link: &str) -> anyhow::Result<()>;
}

/// Writes reset links to the log instead of sending mail.
///
/// The token is redacted at `info`. The usable link is only emitted at
/// `trace`, so it has to be enabled explicitly, e.g.
/// `RUST_LOG=agora_api::mail=trace` on a development box.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_password_reset(&self, to: &str, link: &str) -> anyhow::Result<()> {
        info!(to, "password reset requested: {}", redact(link));
        trace!(to, "password reset link: {}", link);
        Ok(())
    }
}

/// Replaces the last path segment (the token) of a reset link.
fn redact(link: &str) -> String {
    match link.rsplit_once('/') {
        Some((base, _token)) => format!("{base}/<redacted>"),
        None => "<redacted>".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_hides_the_token() {
        assert_eq!(
            redact("http://localhost:3000/forgot-password/abcDEF123"),
            "http://localhost:3000/forgot-password/<redacted>"
        );
        assert_eq!(redact("bare-token"), "<redacted>");
    }
}
