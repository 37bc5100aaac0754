use crate::domain::value_objects::{EntityType, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub entity_type: EntityType,
    pub record_id: RecordId,
    pub label: String,
    pub score: f32,
    pub record: Value,
}

/// Hits grouped by entity type for display, best group first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchGroup {
    pub entity_type: EntityType,
    pub hits: Vec<SearchHit>,
}
