/// Configuration of the single pass lookback protocol.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LookbackConfig {
    /// Number of polls on a single predecessor after which a stalled lookback is reported with a
    /// warning. The lookback keeps waiting afterwards.
    #[serde(default = "stall_warning_spins_default")]
    pub stall_warning_spins: u64,
}

impl Default for LookbackConfig {
    fn default() -> Self {
        Self {
            stall_warning_spins: stall_warning_spins_default(),
        }
    }
}

fn stall_warning_spins_default() -> u64 {
    1 << 24
}
