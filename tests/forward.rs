use anyhow::{Result, anyhow};
use std::cell::RefCell;
use std::collections::HashMap;

use rs_mail_forwarder::domain::email::{DecodedBody, ForwardableMessage, ObjectRef};
use rs_mail_forwarder::forward::event::NotificationBatch;
use rs_mail_forwarder::forward::sender::MailSender;
use rs_mail_forwarder::forward::{ForwardConfig, ForwardError, run_forwarder};
use rs_mail_forwarder::mail::{ConvertError, MessageParseError};
use rs_mail_forwarder::store::repo::ObjectStore;

#[derive(Default)]
struct MemoryStore {
    objects: HashMap<(String, String), Vec<u8>>,
    fetched: RefCell<Vec<String>>,
}

impl MemoryStore {
    fn with(mut self, key: &str, raw: &str) -> Self {
        self.objects
            .insert(("mail".to_string(), key.to_string()), raw.as_bytes().to_vec());
        self
    }
}

impl ObjectStore for MemoryStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.fetched.borrow_mut().push(key.to_string());
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("no such key: {key}"))
    }
}

#[derive(Default)]
struct RecordingSender {
    sent: RefCell<Vec<ForwardableMessage>>,
    fail: bool,
}

impl MailSender for RecordingSender {
    fn send(&self, message: &ForwardableMessage) -> Result<()> {
        if self.fail {
            return Err(anyhow!("throttled"));
        }
        self.sent.borrow_mut().push(message.clone());
        Ok(())
    }
}

const PLAIN: &str = "From: sender@example.com\r\n\
To: recipient@example.com\r\n\
Subject: Test Email\r\n\
\r\n\
This is a test email body.";

const MULTIPART: &str = "From: Alice <alice@example.com>\r\n\
To: inbox@example.org\r\n\
Subject: Weekly digest\r\n\
Content-Type: multipart/alternative; boundary=\"alt\"\r\n\
\r\n\
--alt\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
Y29udm9sdXRpb25hbCBuZXR3b3Jrcw==\r\n\
--alt\r\n\
Content-Type: text/html; charset=utf-8\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
<p>convolutional =\r\n\
networks</p>\r\n\
--alt--\r\n";

fn batch(keys: &[&str]) -> NotificationBatch {
    keys.iter()
        .map(|key| ObjectRef {
            bucket: "mail".to_string(),
            key: key.to_string(),
        })
        .collect()
}

fn config() -> ForwardConfig {
    ForwardConfig {
        forward_to: vec!["mail@example.com".to_string()],
        max_depth: 20,
    }
}

fn stage(err: &anyhow::Error) -> Option<&ForwardError> {
    err.downcast_ref::<ForwardError>()
}

#[test]
fn forwards_plain_message() {
    let store = MemoryStore::default().with("test-key", PLAIN);
    let sender = RecordingSender::default();

    let sent = run_forwarder(&store, &sender, &batch(&["test-key"]), &config()).unwrap();
    assert_eq!(sent, 1);

    let sent = sender.sent.borrow();
    assert_eq!(
        sent[0],
        ForwardableMessage {
            subject: "Test Email".to_string(),
            body: DecodedBody::Text("This is a test email body.".to_string()),
            source: "recipient@example.com".to_string(),
            reply_to: vec!["sender@example.com".to_string()],
            destinations: vec!["mail@example.com".to_string()],
        }
    );
}

#[test]
fn forwards_multipart_as_html() {
    let store = MemoryStore::default().with("digest", MULTIPART);
    let sender = RecordingSender::default();

    run_forwarder(&store, &sender, &batch(&["digest"]), &config()).unwrap();

    let sent = sender.sent.borrow();
    assert_eq!(sent[0].subject, "Weekly digest");
    assert_eq!(sent[0].source, "inbox@example.org");
    assert_eq!(sent[0].reply_to, ["Alice <alice@example.com>"]);
    assert_eq!(
        sent[0].body,
        DecodedBody::Html("convolutional networks<p>convolutional networks</p>".to_string())
    );
}

#[test]
fn processes_records_in_order() {
    let store = MemoryStore::default()
        .with("one", PLAIN)
        .with("two", MULTIPART)
        .with("three", PLAIN);
    let sender = RecordingSender::default();

    let sent = run_forwarder(&store, &sender, &batch(&["one", "two", "three"]), &config()).unwrap();
    assert_eq!(sent, 3);
    assert_eq!(*store.fetched.borrow(), ["one", "two", "three"]);
    let subjects: Vec<_> = sender.sent.borrow().iter().map(|m| m.subject.clone()).collect();
    assert_eq!(subjects, ["Test Email", "Weekly digest", "Test Email"]);
}

#[test]
fn storage_failure_stops_the_batch() {
    let store = MemoryStore::default().with("one", PLAIN).with("three", PLAIN);
    let sender = RecordingSender::default();

    let err = run_forwarder(&store, &sender, &batch(&["one", "missing", "three"]), &config())
        .unwrap_err();
    assert_eq!(
        stage(&err),
        Some(&ForwardError::Storage(ObjectRef {
            bucket: "mail".to_string(),
            key: "missing".to_string(),
        }))
    );
    assert_eq!(sender.sent.borrow().len(), 1);
    assert_eq!(*store.fetched.borrow(), ["one", "missing"]);
}

#[test]
fn headerless_object_stops_the_batch() {
    let store = MemoryStore::default()
        .with("one", PLAIN)
        .with("junk", "hello this whole message has no headers")
        .with("three", PLAIN);
    let sender = RecordingSender::default();

    let err = run_forwarder(&store, &sender, &batch(&["one", "junk", "three"]), &config())
        .unwrap_err();
    assert_eq!(
        stage(&err),
        Some(&ForwardError::MessageParse(ObjectRef {
            bucket: "mail".to_string(),
            key: "junk".to_string(),
        }))
    );
    assert!(
        err.chain()
            .any(|e| matches!(
                e.downcast_ref::<MessageParseError>(),
                Some(MessageParseError::MalformedLine { .. })
            ))
    );
    assert_eq!(sender.sent.borrow().len(), 1);
    assert_eq!(*store.fetched.borrow(), ["one", "junk"]);
}

#[test]
fn conversion_failure_is_reported_with_cause() {
    let broken = "Subject: nested\r\n\
Content-Type: multipart/mixed; boundary=outer\r\n\
\r\n\
--outer\r\n\
Content-Type: multipart/mixed\r\n\
\r\n\
orphan\r\n\
--outer--\r\n";
    let store = MemoryStore::default().with("broken", broken).with("ok", PLAIN);
    let sender = RecordingSender::default();

    let err = run_forwarder(&store, &sender, &batch(&["broken", "ok"]), &config()).unwrap_err();
    assert!(matches!(stage(&err), Some(ForwardError::Convert(_))));
    let cause = err
        .chain()
        .find_map(|e| e.downcast_ref::<ConvertError>())
        .unwrap();
    assert!(cause.is_missing_boundary());
    assert!(sender.sent.borrow().is_empty());
}

#[test]
fn dispatch_failure_is_reported() {
    let store = MemoryStore::default().with("one", PLAIN);
    let sender = RecordingSender {
        fail: true,
        ..Default::default()
    };

    let err = run_forwarder(&store, &sender, &batch(&["one"]), &config()).unwrap_err();
    assert!(matches!(stage(&err), Some(ForwardError::Dispatch(_))));
    assert!(format!("{err:#}").contains("throttled"));
}

#[test]
fn requires_destinations() {
    let store = MemoryStore::default().with("one", PLAIN);
    let sender = RecordingSender::default();
    let cfg = ForwardConfig {
        forward_to: vec![],
        max_depth: 20,
    };

    assert!(run_forwarder(&store, &sender, &batch(&["one"]), &cfg).is_err());
    assert!(store.fetched.borrow().is_empty());
}
