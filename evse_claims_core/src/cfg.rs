/// Ordering applied between claims of equal effective priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Lower client id wins.
    #[default]
    LowestClientId,
    HighestClientId,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ResolveCfg {
    pub tie_break: TieBreak,
    /// Rank for claims with no priority from a client the registry doesn't know.
    pub fallback_priority: i32,
}

impl Default for ResolveCfg {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::LowestClientId,
            fallback_priority: 0,
        }
    }
}
