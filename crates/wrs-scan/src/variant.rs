use bitflags::bitflags;

use crate::ConfigError;

bitflags! {
    /// How a partition scans its own elements.
    ///
    /// Exactly one of `RAKING` and `RANKED` must be set. `STRIDED` only applies to `RANKED`.
    /// The scan is inclusive unless `EXCLUSIVE` is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    pub struct BlockScanVariant: u32 {
        /// Each lane scans a run of consecutive elements, then lane totals are scanned.
        const RAKING = 1;
        /// Log-step scan where every element is combined with the one `2^k` positions before.
        const RANKED = 1 << 1;
        /// Produce an exclusive scan.
        const EXCLUSIVE = 1 << 3;
        /// Produce an inclusive scan.
        const INCLUSIVE = 1 << 4;
        /// The ranked scan works on rows of one element per lane, chained sequentially.
        const STRIDED = 1 << 5;
    }
}

impl Default for BlockScanVariant {
    fn default() -> Self {
        BlockScanVariant::RANKED | BlockScanVariant::STRIDED | BlockScanVariant::INCLUSIVE
    }
}

impl BlockScanVariant {
    /// Checks that the flags can be used together.
    pub fn validate(self) -> Result<Self, ConfigError> {
        let invalid = |reason: &'static str| -> Result<Self, ConfigError> {
            Err(ConfigError::InvalidVariant {
                variant: self,
                reason,
            })
        };

        if self.contains(Self::RAKING | Self::RANKED) {
            return invalid("RAKING and RANKED are mutually exclusive");
        }
        if !self.intersects(Self::RAKING | Self::RANKED) {
            return invalid("either RAKING or RANKED must be selected");
        }
        if self.contains(Self::RAKING | Self::STRIDED) {
            return invalid("STRIDED can only be combined with RANKED");
        }
        if self.contains(Self::INCLUSIVE | Self::EXCLUSIVE) {
            return invalid("INCLUSIVE and EXCLUSIVE are mutually exclusive");
        }

        Ok(self)
    }

    /// If the scan produces exclusive prefixes.
    pub fn is_exclusive(&self) -> bool {
        self.contains(Self::EXCLUSIVE)
    }

    /// A short name of the local scan strategy.
    pub fn name(&self) -> &'static str {
        if self.contains(Self::RAKING) {
            "RAKING"
        } else if self.contains(Self::RANKED | Self::STRIDED) {
            "RANKED-STRIDED"
        } else if self.contains(Self::RANKED) {
            "RANKED"
        } else {
            "UNNAMED"
        }
    }
}
