use thiserror::Error;

/// Every fatal failure kind the codec can report.
///
/// Decode-layer failures that `detect` treats as "no watermark found" rather
/// than a hard error (`NoSync`, `UncorrectableCodeword`, `UnsupportedLength`,
/// `WrongPayloadSize`, and a `ShortInput` encountered during detection) are
/// still constructed as this type internally, but the façade folds them into
/// a non-error `DetectResult` instead of returning `Err`.
#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("io error reading or writing {path}: {source}")]
    IoFailureAt {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    IoFailure(#[from] std::io::Error),

    #[error("wav format mismatch: expected {expected}, found {actual}")]
    FormatMismatch { expected: String, actual: String },

    #[error("input too short: need at least {need_samples} samples, have {have_samples}")]
    ShortInput {
        have_samples: usize,
        need_samples: usize,
    },

    #[error("sync preamble not found")]
    NoSync,

    #[error("reed-solomon codeword uncorrectable: {errors} errors")]
    UncorrectableCodeword { errors: usize },

    #[error("unsupported payload length field: {got}")]
    UnsupportedLength { got: u16 },

    #[error("decoded payload has wrong size: {got} bytes")]
    WrongPayloadSize { got: usize },

    #[error("signature key recovered but no matching payload in store")]
    LookupMiss,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, WatermarkError>;
