//! Codec descriptors carried by client options.
//!
//! Encoding and decoding happen inside the SDK the host connects through; the
//! options only record which converters the connection should be built with.

use std::{fmt, sync::Arc};

/// Encoding written by the default JSON payload converter.
pub const ENCODING_JSON: &str = "json/plain";

/// Identifies a payload converter by the encoding it writes.
pub trait PayloadConverter: Send + Sync + fmt::Debug {
    /// The encoding written into payload metadata.
    fn encoding(&self) -> &str;
}

/// Identifies a failure converter by name.
pub trait FailureConverter: Send + Sync + fmt::Debug {
    /// Name the SDK resolves the converter by.
    fn name(&self) -> &str;
}

/// The stock JSON payload converter.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPayloadConverter;

impl PayloadConverter for JsonPayloadConverter {
    fn encoding(&self) -> &str {
        ENCODING_JSON
    }
}

/// The stock failure converter.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFailureConverter;

impl DefaultFailureConverter {
    /// Name reported by [`FailureConverter::name`].
    pub const NAME: &'static str = "default";
}

impl FailureConverter for DefaultFailureConverter {
    fn name(&self) -> &str {
        Self::NAME
    }
}

/// Payload converter paired with a failure converter.
#[derive(Debug, Clone)]
pub struct DataConverter {
    /// Converter for workflow and activity payloads.
    pub payload_converter: Arc<dyn PayloadConverter>,
    /// Converter for errors sent to and received from the server.
    pub failure_converter: Arc<dyn FailureConverter>,
}

impl Default for DataConverter {
    fn default() -> Self {
        Self::new(JsonPayloadConverter, DefaultFailureConverter)
    }
}

impl DataConverter {
    /// Pairs a payload converter with a failure converter.
    pub fn new(
        payload_converter: impl PayloadConverter + 'static,
        failure_converter: impl FailureConverter + 'static,
    ) -> Self {
        Self {
            payload_converter: Arc::new(payload_converter),
            failure_converter: Arc::new(failure_converter),
        }
    }

    /// Whether both halves are the stock JSON and failure converters.
    pub fn is_default(&self) -> bool {
        self.payload_converter.encoding() == ENCODING_JSON
            && self.failure_converter.name() == DefaultFailureConverter::NAME
    }
}
