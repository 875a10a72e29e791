use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForeError {
    #[error("invalid key: {reason}")]
    InvalidKey { reason: &'static str },

    #[error("position {position} is outside buffer of length {len}")]
    OutOfRange { position: usize, len: usize },

    /// The configured prime/polynomial pair does not define an extension field.
    /// Only reachable through a misconfigured build, never at runtime.
    #[error(
        "field configuration invariant violated: discriminant {discriminant} is a residue mod {prime}"
    )]
    ConfigurationInvariantViolation { prime: u64, discriminant: u64 },

    #[error("malformed encoding: {0}")]
    MalformedEncoding(&'static str),

    #[error("serialization version mismatch for {context}: expected {expected}, found {found}")]
    VersionMismatch {
        context: &'static str,
        expected: u16,
        found: u16,
    },

    #[error("corrupt stored buffer: {0}")]
    CorruptStoredBuffer(&'static str),

    #[error("non-canonical field element ({a}, {b})")]
    NonCanonicalElement { a: u32, b: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
