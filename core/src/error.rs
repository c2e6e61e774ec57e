use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum AccumulatorError {
    /// Construction-time rejection. The accumulator is never created.
    Configuration { message: String },
    /// The incoming sample's dimension differs from the configured one.
    /// Accumulator state is left unmodified when this is returned.
    DimensionMismatch { expected: usize, got: usize },
    /// Not enough samples for the requested statistic.
    InsufficientSamples { required: u64, got: u64 },
    UnknownKind { kind: String },
    UnknownHandle { handle: u64 },
    Checkpoint { message: String },
}

impl fmt::Display for AccumulatorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AccumulatorError::Configuration { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
            AccumulatorError::DimensionMismatch { expected, got } => {
                write!(
                    f,
                    "Sample dimension {} does not match configured dimension {}",
                    got, expected
                )
            }
            AccumulatorError::InsufficientSamples { required, got } => {
                write!(f, "Need at least {} samples, have {}", required, got)
            }
            AccumulatorError::UnknownKind { kind } => {
                write!(f, "Unknown accumulator kind '{}'", kind)
            }
            AccumulatorError::UnknownHandle { handle } => {
                write!(f, "No accumulator registered under handle {}", handle)
            }
            AccumulatorError::Checkpoint { message } => {
                write!(f, "Checkpoint error: {}", message)
            }
        }
    }
}

impl std::error::Error for AccumulatorError {}

impl From<serde_json::Error> for AccumulatorError {
    fn from(err: serde_json::Error) -> Self {
        AccumulatorError::Checkpoint {
            message: err.to_string(),
        }
    }
}
