use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::domain::email::ObjectRef;

/// A batch of object-created notifications, in the order they were delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationBatch {
    #[serde(rename = "Records")]
    pub records: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub s3: StorageEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEntity {
    pub bucket: Bucket,
    pub object: Object,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    pub key: String,
}

impl Notification {
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef {
            bucket: self.s3.bucket.name.clone(),
            key: self.s3.object.key.clone(),
        }
    }
}

impl NotificationBatch {
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let batch: Self = serde_json::from_slice(data)?;
        if batch.records.is_empty() {
            return Err(anyhow!("notification batch has no records"));
        }
        Ok(batch)
    }

    pub fn from_reader(mut r: impl Read) -> Result<Self> {
        let mut buf = Vec::new();
        r.read_to_end(&mut buf)?;
        Self::from_slice(&buf)
    }

    pub fn objects(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.records.iter().map(Notification::object_ref)
    }
}

impl FromIterator<ObjectRef> for NotificationBatch {
    fn from_iter<I: IntoIterator<Item = ObjectRef>>(iter: I) -> Self {
        let records = iter
            .into_iter()
            .map(|o| Notification {
                s3: StorageEntity {
                    bucket: Bucket { name: o.bucket },
                    object: Object { key: o.key },
                },
            })
            .collect();
        Self { records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_event_and_keeps_order() {
        let json = br#"{
            "Records": [
                {"eventName": "ObjectCreated:Put",
                 "s3": {"bucket": {"name": "mail", "arn": "x"}, "object": {"key": "a+b%2F1", "size": 12}}},
                {"s3": {"bucket": {"name": "mail"}, "object": {"key": "second"}}}
            ]
        }"#;
        let batch = NotificationBatch::from_slice(json).unwrap();
        let objects: Vec<_> = batch.objects().collect();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].to_string(), "mail/a+b%2F1");
        assert_eq!(objects[1].key, "second");
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(NotificationBatch::from_slice(br#"{"Records": []}"#).is_err());
        assert!(NotificationBatch::from_slice(b"{}").is_err());
    }
}
