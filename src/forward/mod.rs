pub mod event;
pub mod sender;

use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use thiserror::Error;

use crate::domain::email::{ForwardableMessage, ObjectRef};
use crate::forward::event::NotificationBatch;
use crate::forward::sender::MailSender;
use crate::mail::{Converter, RawMessage};
use crate::store::repo::ObjectStore;

/// Stage at which forwarding an object failed.
///
/// Attached as context to the underlying error, so callers can recover it with
/// `err.downcast_ref::<ForwardError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardError {
    #[error("failed to get object {0} from storage")]
    Storage(ObjectRef),
    #[error("failed to parse email {0}")]
    MessageParse(ObjectRef),
    #[error("failed to convert message {0}")]
    Convert(ObjectRef),
    #[error("failed to send email {0}")]
    Dispatch(ObjectRef),
}

pub struct ForwardConfig {
    pub forward_to: Vec<String>,
    pub max_depth: usize,
}

/// Forwards every object of the batch in order, stopping at the first failure.
///
/// Returns how many messages were sent.
pub fn run_forwarder(
    store: &dyn ObjectStore,
    sender: &dyn MailSender,
    batch: &NotificationBatch,
    cfg: &ForwardConfig,
) -> Result<usize> {
    if cfg.forward_to.is_empty() {
        return Err(anyhow!("no forward-to addresses configured"));
    }
    let converter = Converter::with_max_depth(cfg.max_depth);

    batch.objects().try_fold(0, |sent, object| -> Result<usize> {
        forward_object(store, sender, &converter, &object, &cfg.forward_to)?;
        Ok(sent + 1)
    })
}

pub fn forward_object(
    store: &dyn ObjectStore,
    sender: &dyn MailSender,
    converter: &Converter,
    object: &ObjectRef,
    forward_to: &[String],
) -> Result<()> {
    debug!("fetching {object}");
    let raw = store
        .get_object(&object.bucket, &object.key)
        .with_context(|| ForwardError::Storage(object.clone()))?;

    let message =
        RawMessage::parse(&raw).with_context(|| ForwardError::MessageParse(object.clone()))?;

    let from = message.header("From").unwrap_or_default().to_string();
    let to = message.header("To").unwrap_or_default().to_string();
    if from.is_empty() || to.is_empty() {
        warn!("{object} is missing a From or To header");
    }

    let converted = converter
        .convert(message)
        .with_context(|| ForwardError::Convert(object.clone()))?;

    let outgoing = ForwardableMessage {
        subject: converted.subject,
        body: converted.body,
        source: to,
        reply_to: vec![from.clone()],
        destinations: forward_to.to_vec(),
    };
    sender
        .send(&outgoing)
        .with_context(|| ForwardError::Dispatch(object.clone()))?;

    info!("forwarded email from {from} to {:?}", outgoing.destinations);
    Ok(())
}
