use anyhow::{Context, Result};
use log::debug;
use std::io::Write;

use crate::domain::email::ForwardableMessage;

/// The outbound mail API.
pub trait MailSender {
    fn send(&self, message: &ForwardableMessage) -> Result<()>;
}

/// Posts each message as JSON to a mail-sending HTTP endpoint.
pub struct HttpMailSender {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpMailSender {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .context("building HTTP client")?;
        Ok(Self::with_client(client, endpoint, token))
    }

    pub fn with_client(
        client: reqwest::blocking::Client,
        endpoint: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token,
        }
    }
}

impl MailSender for HttpMailSender {
    fn send(&self, message: &ForwardableMessage) -> Result<()> {
        let mut req = self.client.post(&self.endpoint).json(message);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send()?.error_for_status()?;
        debug!("mail API answered {}", resp.status());
        Ok(())
    }
}

/// Prints messages instead of sending them.
pub struct StdoutMailSender;

impl MailSender for StdoutMailSender {
    fn send(&self, message: &ForwardableMessage) -> Result<()> {
        let mut out = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, message)?;
        writeln!(out)?;
        Ok(())
    }
}
