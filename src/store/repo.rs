use anyhow::Result;

/// Where inbound raw messages are fetched from.
pub trait ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}
