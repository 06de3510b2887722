use thiserror::Error;

use crate::BlockScanVariant;

/// Invalid configuration, detected when an algorithm is created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The block scan variant combines flags that can't be used together.
    #[error("Invalid block scan variant {variant:?}: {reason}")]
    InvalidVariant {
        /// The rejected variant.
        variant: BlockScanVariant,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A size parameter is zero.
    #[error("The {name} must be greater than zero")]
    ZeroSize {
        /// The name of the parameter.
        name: &'static str,
    },

    /// The parallel lookback depth is out of range.
    #[error("The parallel lookback depth {depth} must be between 1 and {max}")]
    InvalidLookbackDepth {
        /// The requested depth.
        depth: u32,
        /// The maximum supported depth.
        max: u32,
    },

    /// Numerically stable summation was requested.
    #[error("Numerically stable summation is not implemented")]
    StableSummationUnsupported,

    /// Reverse memory order was requested with an engine that doesn't support it.
    #[error("Reverse memory order is only supported by the decoupled prefix sum")]
    ReverseMemoryOrderUnsupported,
}
