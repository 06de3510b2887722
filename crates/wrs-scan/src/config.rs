use serde::{Deserialize, Serialize};

use crate::{BlockScanVariant, ConfigError, block_scan::BlockGeometry};

/// The largest supported parallel lookback depth.
pub const MAX_PARALLEL_LOOKBACK_DEPTH: u32 = 64;

/// The largest number of elements the decoupled engine accepts.
pub const DECOUPLED_MAX_ELEMENT_COUNT: usize = 1 << 28;

/// How a partition obtains its id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, derive_more::Display,
)]
pub enum PartitionIdPolicy {
    /// Ids are taken from an atomic counter in the state buffer, in the order partitions start.
    #[default]
    #[display("dynamic")]
    Dynamic,
    /// Ids are the launch index of the cube.
    #[display("static")]
    Static,
}

/// How sums are accumulated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, derive_more::Display,
)]
pub enum SummationMode {
    /// Plain floating point additions.
    #[default]
    #[display("fast")]
    Fast,
    /// Compensated summation, not implemented.
    #[display("stable")]
    Stable,
}

impl SummationMode {
    fn validate(self) -> Result<(), ConfigError> {
        match self {
            SummationMode::Fast => Ok(()),
            SummationMode::Stable => Err(ConfigError::StableSummationUnsupported),
        }
    }
}

fn non_zero(value: u32, name: &'static str) -> Result<(), ConfigError> {
    match value {
        0 => Err(ConfigError::ZeroSize { name }),
        _ => Ok(()),
    }
}

/// Configuration of the single pass decoupled lookback engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecoupledConfig {
    /// Lanes per partition.
    pub workgroup_size: u32,
    /// Elements per lane.
    pub rows: u32,
    /// Number of predecessors polled per lookback round.
    pub parallel_lookback_depth: u32,
    /// Local scan strategy.
    pub variant: BlockScanVariant,
    /// How partitions obtain their id.
    pub id_policy: PartitionIdPolicy,
    /// How sums are accumulated.
    pub summation: SummationMode,
}

impl Default for DecoupledConfig {
    fn default() -> Self {
        Self {
            workgroup_size: 512,
            rows: 8,
            parallel_lookback_depth: 32,
            variant: BlockScanVariant::default(),
            id_policy: PartitionIdPolicy::Dynamic,
            summation: SummationMode::Fast,
        }
    }
}

impl DecoupledConfig {
    /// Creates a configuration with the given partition shape and default settings otherwise.
    pub fn new(workgroup_size: u32, rows: u32) -> Self {
        Self {
            workgroup_size,
            rows,
            ..Default::default()
        }
    }

    pub fn with_parallel_lookback_depth(mut self, depth: u32) -> Self {
        self.parallel_lookback_depth = depth;
        self
    }

    pub fn with_variant(mut self, variant: BlockScanVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_id_policy(mut self, id_policy: PartitionIdPolicy) -> Self {
        self.id_policy = id_policy;
        self
    }

    pub fn with_summation(mut self, summation: SummationMode) -> Self {
        self.summation = summation;
        self
    }

    /// Elements per partition.
    pub fn partition_size(&self) -> usize {
        self.workgroup_size as usize * self.rows as usize
    }

    pub fn geometry(&self) -> BlockGeometry {
        BlockGeometry::new(self.workgroup_size as usize, self.rows as usize)
    }

    pub fn partition_count(&self, n: usize) -> usize {
        n.div_ceil(self.partition_size())
    }

    pub fn max_element_count(&self) -> usize {
        DECOUPLED_MAX_ELEMENT_COUNT
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        non_zero(self.workgroup_size, "workgroup size")?;
        non_zero(self.rows, "number of rows")?;
        if self.parallel_lookback_depth == 0
            || self.parallel_lookback_depth > MAX_PARALLEL_LOOKBACK_DEPTH
        {
            return Err(ConfigError::InvalidLookbackDepth {
                depth: self.parallel_lookback_depth,
                max: MAX_PARALLEL_LOOKBACK_DEPTH,
            });
        }
        self.variant.validate()?;
        self.summation.validate()?;

        Ok(self)
    }

    pub fn name(&self) -> String {
        format!(
            "Decoupled-{}-{}x{}-depth{}-{}",
            self.variant.name(),
            self.workgroup_size,
            self.rows,
            self.parallel_lookback_depth,
            self.id_policy
        )
    }
}

/// Configuration of the three stage block-wise engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockWiseConfig {
    /// Lanes per block.
    pub workgroup_size: u32,
    /// Elements per lane and per sequential step.
    pub rows: u32,
    /// Sequential steps per lane.
    pub sequential_scan_length: u32,
    /// Local scan strategy, used by both the block and the top level scans.
    pub variant: BlockScanVariant,
    /// Lanes of the top level scan.
    pub top_level_workgroup_size: u32,
    /// Elements per lane of the top level scan.
    pub top_level_rows: u32,
    /// How sums are accumulated.
    pub summation: SummationMode,
}

impl Default for BlockWiseConfig {
    fn default() -> Self {
        Self {
            workgroup_size: 512,
            rows: 8,
            sequential_scan_length: 1,
            variant: BlockScanVariant::default(),
            top_level_workgroup_size: 512,
            top_level_rows: 8,
            summation: SummationMode::Fast,
        }
    }
}

impl BlockWiseConfig {
    /// Creates a configuration with the given block shape and default settings otherwise.
    pub fn new(workgroup_size: u32, rows: u32) -> Self {
        Self {
            workgroup_size,
            rows,
            ..Default::default()
        }
    }

    pub fn with_sequential_scan_length(mut self, length: u32) -> Self {
        self.sequential_scan_length = length;
        self
    }

    pub fn with_variant(mut self, variant: BlockScanVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_top_level(mut self, workgroup_size: u32, rows: u32) -> Self {
        self.top_level_workgroup_size = workgroup_size;
        self.top_level_rows = rows;
        self
    }

    pub fn with_summation(mut self, summation: SummationMode) -> Self {
        self.summation = summation;
        self
    }

    /// Elements per block.
    pub fn block_size(&self) -> usize {
        self.workgroup_size as usize * self.rows as usize * self.sequential_scan_length as usize
    }

    pub fn geometry(&self) -> BlockGeometry {
        BlockGeometry::new(
            self.workgroup_size as usize,
            self.rows as usize * self.sequential_scan_length as usize,
        )
    }

    pub fn top_level_geometry(&self) -> BlockGeometry {
        BlockGeometry::new(
            self.top_level_workgroup_size as usize,
            self.top_level_rows as usize,
        )
    }

    /// The largest number of blocks the top level scan handles.
    pub fn top_level_capacity(&self) -> usize {
        self.top_level_workgroup_size as usize * self.top_level_rows as usize
    }

    pub fn block_count(&self, n: usize) -> usize {
        n.div_ceil(self.block_size())
    }

    pub fn max_element_count(&self) -> usize {
        self.block_size() * self.top_level_capacity()
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        non_zero(self.workgroup_size, "workgroup size")?;
        non_zero(self.rows, "number of rows")?;
        non_zero(self.sequential_scan_length, "sequential scan length")?;
        non_zero(self.top_level_workgroup_size, "top level workgroup size")?;
        non_zero(self.top_level_rows, "number of top level rows")?;
        self.variant.validate()?;
        self.summation.validate()?;

        Ok(self)
    }

    pub fn name(&self) -> String {
        format!(
            "BlockWise-{}-{}x{}x{}-cap{}",
            self.variant.name(),
            self.workgroup_size,
            self.rows,
            self.sequential_scan_length,
            self.top_level_capacity()
        )
    }
}

/// Configuration of the mean computed with atomic float additions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtomicMeanConfig {
    /// Lanes per partition.
    pub workgroup_size: u32,
    /// Elements per lane.
    pub rows: u32,
    /// How sums are accumulated.
    pub summation: SummationMode,
}

impl Default for AtomicMeanConfig {
    fn default() -> Self {
        Self {
            workgroup_size: 512,
            rows: 8,
            summation: SummationMode::Fast,
        }
    }
}

impl AtomicMeanConfig {
    pub fn new(workgroup_size: u32, rows: u32) -> Self {
        Self {
            workgroup_size,
            rows,
            summation: SummationMode::Fast,
        }
    }

    pub fn partition_size(&self) -> usize {
        self.workgroup_size as usize * self.rows as usize
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        non_zero(self.workgroup_size, "workgroup size")?;
        non_zero(self.rows, "number of rows")?;
        self.summation.validate()?;

        Ok(self)
    }

    pub fn name(&self) -> String {
        format!("Atomic-{}x{}", self.workgroup_size, self.rows)
    }
}

/// The engine used by an algorithm, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanStrategy {
    /// Single dispatch with decoupled lookback.
    Decoupled(DecoupledConfig),
    /// Three dispatches separated by barriers.
    BlockWise(BlockWiseConfig),
}

impl Default for ScanStrategy {
    fn default() -> Self {
        ScanStrategy::Decoupled(DecoupledConfig::default())
    }
}

impl ScanStrategy {
    pub fn validate(self) -> Result<Self, ConfigError> {
        match self {
            ScanStrategy::Decoupled(config) => config.validate().map(ScanStrategy::Decoupled),
            ScanStrategy::BlockWise(config) => config.validate().map(ScanStrategy::BlockWise),
        }
    }

    pub fn max_element_count(&self) -> usize {
        match self {
            ScanStrategy::Decoupled(config) => config.max_element_count(),
            ScanStrategy::BlockWise(config) => config.max_element_count(),
        }
    }

    pub fn variant(&self) -> BlockScanVariant {
        match self {
            ScanStrategy::Decoupled(config) => config.variant,
            ScanStrategy::BlockWise(config) => config.variant,
        }
    }

    /// The lanes processing a single partition or block.
    pub fn geometry(&self) -> BlockGeometry {
        match self {
            ScanStrategy::Decoupled(config) => config.geometry(),
            ScanStrategy::BlockWise(config) => config.geometry(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            ScanStrategy::Decoupled(config) => config.name(),
            ScanStrategy::BlockWise(config) => config.name(),
        }
    }
}

/// The engine used to compute a mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeanStrategy {
    /// Single dispatch with decoupled lookback, the last partition divides the total.
    Decoupled(DecoupledConfig),
    /// Three dispatches, the last block divides the total.
    BlockWise(BlockWiseConfig),
    /// Single dispatch where partitions add their share with atomic float additions.
    Atomic(AtomicMeanConfig),
}

impl Default for MeanStrategy {
    fn default() -> Self {
        MeanStrategy::Decoupled(DecoupledConfig::default())
    }
}

impl From<ScanStrategy> for MeanStrategy {
    fn from(strategy: ScanStrategy) -> Self {
        match strategy {
            ScanStrategy::Decoupled(config) => MeanStrategy::Decoupled(config),
            ScanStrategy::BlockWise(config) => MeanStrategy::BlockWise(config),
        }
    }
}

impl MeanStrategy {
    pub fn validate(self) -> Result<Self, ConfigError> {
        match self {
            MeanStrategy::Decoupled(config) => config.validate().map(MeanStrategy::Decoupled),
            MeanStrategy::BlockWise(config) => config.validate().map(MeanStrategy::BlockWise),
            MeanStrategy::Atomic(config) => config.validate().map(MeanStrategy::Atomic),
        }
    }

    pub fn max_element_count(&self) -> usize {
        match self {
            MeanStrategy::Decoupled(config) => config.max_element_count(),
            MeanStrategy::BlockWise(config) => config.max_element_count(),
            MeanStrategy::Atomic(_) => DECOUPLED_MAX_ELEMENT_COUNT,
        }
    }

    pub fn name(&self) -> String {
        match self {
            MeanStrategy::Decoupled(config) => config.name(),
            MeanStrategy::BlockWise(config) => config.name(),
            MeanStrategy::Atomic(config) => config.name(),
        }
    }
}
