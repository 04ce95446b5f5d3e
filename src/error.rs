use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FingerprintError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Poor quality sample: spectral {spectral:.3}, spatial {spatial:.3}")]
    PoorQuality { spectral: f32, spatial: f32 },

    #[error("Enhancement failed: spatial quality {spatial:.3} after enhancement")]
    EnhancementFailed { spatial: f32 },

    #[error("Void image: nothing left to thin after enhancement")]
    VoidImage,

    #[error("Too few minutiae: found {found}, required {required}")]
    TooFewMinutiae { found: usize, required: usize },

    #[error("Wrong angles: triangle interior angles could not be resolved")]
    WrongAngles,

    #[error("Internal invariant violated: {0}")]
    InternalInvariantViolated(String),
}

pub type Result<T> = std::result::Result<T, FingerprintError>;
