use super::CachedRecord;

/// What a façade read returned and where it came from, so screens can
/// badge stale data instead of passing it off as live.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    pub data: Vec<CachedRecord>,
    pub is_offline: bool,
    pub is_using_cache: bool,
}
