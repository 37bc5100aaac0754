use crate::application::services::read_service::ReadService;
use crate::domain::entities::offline::{CachedRecord, SearchGroup, SearchHit};
use crate::domain::value_objects::{EntityType, TenantId};
use crate::shared::error::Result;
use std::sync::Arc;

/// Minimum query length; shorter inputs return nothing rather than
/// matching half the cache.
const MIN_QUERY_LEN: usize = 2;

const EXACT: f32 = 100.0;
const PREFIX: f32 = 80.0;
const SUBSTRING: f32 = 60.0;
const SUBSEQUENCE: f32 = 40.0;

struct FieldSpec {
    field: &'static str,
    weight: f32,
}

const fn f(field: &'static str, weight: f32) -> FieldSpec {
    FieldSpec { field, weight }
}

/// Which cached fields each entity type is searchable on. The first
/// field doubles as the hit label.
const SEARCH_FIELDS: &[(&str, &[FieldSpec])] = &[
    (
        "students",
        &[
            f("full_name", 1.0),
            f("admission_no", 0.9),
            f("guardian_name", 0.6),
            f("guardian_phone", 0.7),
        ],
    ),
    (
        "staff",
        &[f("full_name", 1.0), f("phone", 0.7), f("designation", 0.5)],
    ),
    ("sections", &[f("name", 1.0), f("class_name", 0.8)]),
    (
        "leads",
        &[f("contact_name", 1.0), f("phone", 0.8), f("source", 0.4)],
    ),
    (
        "invoices",
        &[f("invoice_no", 1.0), f("student_name", 0.8)],
    ),
    ("homework", &[f("title", 1.0), f("section_name", 0.6)]),
];

/// Substring search across the local cache, fully offline. Scores are
/// match-kind buckets scaled by a per-field weight, so an exact name hit
/// always outranks a fuzzy phone fragment.
pub struct SearchService {
    read: Arc<ReadService>,
    result_cap: usize,
}

impl SearchService {
    pub fn new(read: Arc<ReadService>, result_cap: usize) -> Self {
        Self { read, result_cap }
    }

    /// Hits grouped by entity type, best group first, capped overall.
    pub async fn search(&self, tenant: &TenantId, query: &str) -> Result<Vec<SearchGroup>> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SearchHit> = Vec::new();
        for (type_name, fields) in SEARCH_FIELDS {
            let entity_type = EntityType::known(type_name);
            let records = self.read.records(tenant, &entity_type).await?;
            for record in &records {
                if let Some(hit) = score_record(&entity_type, record, fields, &query) {
                    hits.push(hit);
                }
            }
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.label.cmp(&b.label))
        });
        hits.truncate(self.result_cap);

        Ok(group_hits(hits))
    }
}

fn score_record(
    entity_type: &EntityType,
    record: &CachedRecord,
    fields: &[FieldSpec],
    query: &str,
) -> Option<SearchHit> {
    let mut best: f32 = 0.0;
    for spec in fields {
        if let Some(value) = record.field_str(spec.field) {
            let score = match_score(query, value) * spec.weight;
            if score > best {
                best = score;
            }
        }
    }
    if best <= 0.0 {
        return None;
    }

    let label = fields
        .iter()
        .find_map(|spec| record.field_str(spec.field))
        .unwrap_or(record.record_id.as_str())
        .to_string();
    Some(SearchHit {
        entity_type: entity_type.clone(),
        record_id: record.record_id.clone(),
        label,
        score: best,
        record: record.payload.clone(),
    })
}

fn match_score(query: &str, value: &str) -> f32 {
    let value = value.to_lowercase();
    if value == query {
        EXACT
    } else if value.starts_with(query) {
        PREFIX
    } else if value.contains(query) {
        SUBSTRING
    } else if is_subsequence(query, &value) {
        SUBSEQUENCE
    } else {
        0.0
    }
}

/// Query characters appear in order, not necessarily adjacent.
fn is_subsequence(query: &str, value: &str) -> bool {
    let mut chars = query.chars().peekable();
    for c in value.chars() {
        if chars.peek() == Some(&c) {
            chars.next();
        }
    }
    chars.peek().is_none()
}

/// Preserves best-first order both across and within groups.
fn group_hits(hits: Vec<SearchHit>) -> Vec<SearchGroup> {
    let mut groups: Vec<SearchGroup> = Vec::new();
    for hit in hits {
        match groups.iter_mut().find(|g| g.entity_type == hit.entity_type) {
            Some(group) => group.hits.push(hit),
            None => groups.push(SearchGroup {
                entity_type: hit.entity_type.clone(),
                hits: vec![hit],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::offline::CachedRecord;
    use crate::domain::value_objects::RecordId;
    use crate::infrastructure::database::ConnectionPool;
    use crate::infrastructure::offline::SqliteRecordStore;
    use serde_json::json;

    fn tenant() -> TenantId {
        TenantId::parse("school-a").unwrap()
    }

    fn record(entity: &str, id: &str, payload: serde_json::Value) -> CachedRecord {
        CachedRecord::new(
            RecordId::parse(id).unwrap(),
            tenant(),
            EntityType::known(entity),
            payload,
        )
    }

    async fn service(cap: usize) -> (SearchService, Arc<ReadService>) {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        let (_tx, link) = tokio::sync::watch::channel(
            crate::domain::entities::offline::ConnectionSnapshot::offline(),
        );
        let read = Arc::new(ReadService::new(
            Arc::new(SqliteRecordStore::new(pool, 100 * 1024 * 1024)),
            link,
        ));
        (SearchService::new(read.clone(), cap), read)
    }

    #[tokio::test]
    async fn prefix_outranks_substring() {
        let (svc, read) = service(50).await;
        read.replace_cache(
            &tenant(),
            &EntityType::known("students"),
            vec![
                record("students", "s1", json!({ "full_name": "Dana Ann" })),
                record("students", "s2", json!({ "full_name": "Anna Lee" })),
            ],
        )
        .await
        .unwrap();

        let groups = svc.search(&tenant(), "ann").await.unwrap();
        let hits = &groups[0].hits;
        assert_eq!(hits[0].label, "Anna Lee");
        assert_eq!(hits[1].label, "Dana Ann");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn short_queries_return_nothing() {
        let (svc, read) = service(50).await;
        read.replace_cache(
            &tenant(),
            &EntityType::known("students"),
            vec![record("students", "s1", json!({ "full_name": "Anna Lee" }))],
        )
        .await
        .unwrap();

        assert!(svc.search(&tenant(), "a").await.unwrap().is_empty());
        assert!(svc.search(&tenant(), "  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn groups_by_entity_type_best_first() {
        let (svc, read) = service(50).await;
        read.replace_cache(
            &tenant(),
            &EntityType::known("students"),
            vec![record(
                "students",
                "s1",
                json!({ "full_name": "Ravi Kumar" }),
            )],
        )
        .await
        .unwrap();
        read.replace_cache(
            &tenant(),
            &EntityType::known("leads"),
            vec![record("leads", "l1", json!({ "contact_name": "ravi" }))],
        )
        .await
        .unwrap();

        let groups = svc.search(&tenant(), "ravi").await.unwrap();
        assert_eq!(groups.len(), 2);
        // exact lead match beats the student prefix match
        assert_eq!(groups[0].entity_type.as_str(), "leads");
        assert_eq!(groups[1].entity_type.as_str(), "students");
    }

    #[tokio::test]
    async fn weighted_field_scores() {
        let (svc, read) = service(50).await;
        read.replace_cache(
            &tenant(),
            &EntityType::known("students"),
            vec![
                record("students", "s1", json!({ "full_name": "Meera Shah" })),
                record(
                    "students",
                    "s2",
                    json!({ "full_name": "Arjun Patel", "guardian_name": "Meera Patel" }),
                ),
            ],
        )
        .await
        .unwrap();

        let groups = svc.search(&tenant(), "meera").await.unwrap();
        let hits = &groups[0].hits;
        // direct name prefix (80 x 1.0) over guardian prefix (80 x 0.6)
        assert_eq!(hits[0].label, "Meera Shah");
        assert_eq!(hits[1].label, "Arjun Patel");
    }

    #[tokio::test]
    async fn result_cap_applies_across_types() {
        let (svc, read) = service(3).await;
        let records: Vec<CachedRecord> = (0..10)
            .map(|i| {
                record(
                    "students",
                    &format!("s{i}"),
                    json!({ "full_name": format!("Anna {i}") }),
                )
            })
            .collect();
        read.replace_cache(&tenant(), &EntityType::known("students"), records)
            .await
            .unwrap();

        let groups = svc.search(&tenant(), "anna").await.unwrap();
        let total: usize = groups.iter().map(|g| g.hits.len()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn subsequence_matching() {
        assert!(is_subsequence("anl", "anna lee"));
        assert!(!is_subsequence("zx", "anna lee"));
        assert_eq!(match_score("anna lee", "Anna Lee"), EXACT);
        assert_eq!(match_score("ann", "Anna Lee"), PREFIX);
        assert_eq!(match_score("ann", "Dana Ann"), SUBSTRING);
        assert_eq!(match_score("dna", "Dana Ann"), SUBSEQUENCE);
    }
}
