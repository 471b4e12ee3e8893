use crate::buffer::Batch;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use thiserror::Error;

// Maximum capacity hint to prevent oversized up-front allocations
const MAX_SAFE_BUFFER_SIZE: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error during serialization: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Batch is empty")]
    EmptyBatch,
}

/// Encodes batches as NDJSON, one `LogEntry` object per line.
#[derive(Debug, Clone, Default)]
pub struct BatchSerializer;

impl BatchSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn serialize_ndjson(&self, batch: &Batch) -> Result<Vec<u8>, SerializationError> {
        if batch.is_empty() {
            return Err(SerializationError::EmptyBatch);
        }

        let capacity = batch.estimated_size().min(MAX_SAFE_BUFFER_SIZE);
        let mut buffer = Vec::with_capacity(capacity);

        for entry in batch.entries() {
            serde_json::to_writer(&mut buffer, entry)?;
            buffer.write_all(b"\n")?;
        }

        Ok(buffer)
    }

    pub fn serialize_compressed(&self, batch: &Batch) -> Result<Vec<u8>, SerializationError> {
        let ndjson = self.serialize_ndjson(batch)?;
        let mut encoder = GzEncoder::new(Vec::with_capacity(ndjson.len() / 4), Compression::fast());
        encoder.write_all(&ndjson)?;
        Ok(encoder.finish()?)
    }
}
