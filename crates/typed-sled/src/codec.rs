use crate::schema::Schema;

/// Errors arising while encoding or decoding schema keys and values.
///
/// Codec failures are never transient: a value that fails to decode will
/// keep failing, so callers must not retry them.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A key buffer had a different length than the schema expects.
    #[error("invalid key length in '{schema}': expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        schema: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Encoding a key or value failed.
    #[error("serialization failed in '{schema}'")]
    SerializationFailed {
        schema: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Decoding a key or value failed.
    #[error("deserialization failed in '{schema}'")]
    DeserializationFailed {
        schema: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Binary codec for the key type of a schema.
pub trait KeyCodec<S: Schema>: Sized {
    fn encode_key(&self) -> CodecResult<Vec<u8>>;
    fn decode_key(buf: &[u8]) -> CodecResult<Self>;
}

/// Binary codec for the value type of a schema.
pub trait ValueCodec<S: Schema>: Sized {
    fn encode_value(&self) -> CodecResult<Vec<u8>>;
    fn decode_value(buf: &[u8]) -> CodecResult<Self>;
}
