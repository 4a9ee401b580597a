//! Error types for nalscope-bitstream

/// Errors that can occur while reading or interpreting a bitstream
#[derive(Debug, thiserror::Error)]
pub enum BitstreamError {
    /// The buffer ended before the requested number of bits
    #[error("Out of data: requested {requested} bits but only {remaining} remain")]
    OutOfData { requested: usize, remaining: usize },

    /// Exp-Golomb prefix longer than the sanity bound
    #[error("Malformed Exp-Golomb code: more than {max_leading_zeros} leading zero bits")]
    MalformedCode { max_leading_zeros: u32 },

    /// Byte block read attempted off a byte boundary
    #[error("Trying to read bytes while not byte aligned")]
    NotByteAligned,

    /// Fixed-width reads are limited to 64 bits
    #[error("Cannot read {0} bits at once (at most 64)")]
    InvalidWidth(usize),

    /// Decoded value failed a configured range check
    #[error("{symbol}: {message}")]
    SemanticRange { symbol: String, message: String },

    /// Referenced parameter set has not been received
    #[error("Missing reference: {kind} with id {id} is not active")]
    MissingReference { kind: &'static str, id: u64 },

    /// A value derived from parsed fields does not fit its type
    #[error("Derived value {0} overflows")]
    Overflow(&'static str),

    /// Byte vector and its bit string disagree
    #[error("Size mismatch: {bytes} bytes but {bits} code bits")]
    SizeMismatch { bytes: usize, bits: usize },

    /// A symbol read failed; wraps the underlying cursor error
    #[error("Error reading {context}")]
    Read {
        context: String,
        #[source]
        source: Box<BitstreamError>,
    },

    /// NAL unit header could not be interpreted
    #[error("Malformed NAL unit header: {0}")]
    MalformedHeader(String),

    /// IO error from a byte source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BitstreamError {
    /// The innermost error, skipping any `Read` wrappers
    pub fn root_cause(&self) -> &BitstreamError {
        match self {
            BitstreamError::Read { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, BitstreamError>;
