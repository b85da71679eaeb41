//! Graph store trait for knowledge-graph triples

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::Result;
use crate::types::GraphTriple;

/// Storage for extracted (subject, relation, object) triples
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Add triples for a document; returns how many were written
    async fn upsert_triples(&self, document_id: Uuid, triples: &[GraphTriple]) -> Result<usize>;

    /// Distinct source chunk ids of triples whose subject or object contains
    /// any entity (case-insensitive), in insertion order, at most `limit`
    async fn query_by_entities(
        &self,
        entities: &[String],
        document_id: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Uuid>>;

    /// Remove all triples for a document
    async fn clear(&self, document_id: Uuid) -> Result<usize>;

    /// Get store name for logging
    fn name(&self) -> &str;
}

/// Match triples against entities, keeping the first occurrence of each chunk
pub fn match_triples<'a, I>(
    triples: I,
    entities: &[String],
    document_id: Option<Uuid>,
    limit: usize,
) -> Vec<Uuid>
where
    I: IntoIterator<Item = &'a GraphTriple>,
{
    let needles: Vec<String> = entities
        .iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();
    if needles.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut chunk_ids = Vec::new();

    for triple in triples {
        if document_id.map_or(false, |id| triple.document_id != id) {
            continue;
        }
        if needles.iter().any(|n| triple.mentions(n)) && seen.insert(triple.chunk_id) {
            chunk_ids.push(triple.chunk_id);
            if chunk_ids.len() >= limit {
                break;
            }
        }
    }

    chunk_ids
}

/// Graph store held in process memory
#[derive(Default)]
pub struct InMemoryGraphStore {
    triples: RwLock<Vec<GraphTriple>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.triples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.read().is_empty()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn upsert_triples(&self, document_id: Uuid, triples: &[GraphTriple]) -> Result<usize> {
        let mut stored = self.triples.write();
        let mut written = 0;
        for triple in triples {
            if stored.contains(triple) {
                continue;
            }
            let mut triple = triple.clone();
            triple.document_id = document_id;
            stored.push(triple);
            written += 1;
        }
        Ok(written)
    }

    async fn query_by_entities(
        &self,
        entities: &[String],
        document_id: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Uuid>> {
        let stored = self.triples.read();
        Ok(match_triples(stored.iter(), entities, document_id, limit))
    }

    async fn clear(&self, document_id: Uuid) -> Result<usize> {
        let mut stored = self.triples.write();
        let before = stored.len();
        stored.retain(|t| t.document_id != document_id);
        Ok(before - stored.len())
    }

    fn name(&self) -> &str {
        "in-memory-graph"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(subject: &str, object: &str, chunk_id: Uuid, document_id: Uuid) -> GraphTriple {
        GraphTriple {
            subject: subject.to_string(),
            relation: "relates_to".to_string(),
            object: object.to_string(),
            chunk_id,
            document_id,
        }
    }

    #[tokio::test]
    async fn test_query_distinct_in_insertion_order() {
        let store = InMemoryGraphStore::new();
        let doc = Uuid::new_v4();
        let (c1, c2, c3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store
            .upsert_triples(
                doc,
                &[
                    triple("Python List", "mutable", c2, doc),
                    triple("list", "mixed types", c2, doc),
                    triple("Tuple", "immutable", c3, doc),
                    triple("python", "dynamic typing", c1, doc),
                ],
            )
            .await
            .unwrap();

        let ids = store
            .query_by_entities(&["LIST".to_string(), "Python".to_string()], Some(doc), 10)
            .await
            .unwrap();
        assert_eq!(ids, vec![c2, c1]);
    }

    #[tokio::test]
    async fn test_document_filter_limit_and_clear() {
        let store = InMemoryGraphStore::new();
        let (doc_a, doc_b) = (Uuid::new_v4(), Uuid::new_v4());
        let (c1, c2, c3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store
            .upsert_triples(doc_a, &[triple("list", "x", c1, doc_a), triple("list", "y", c2, doc_a)])
            .await
            .unwrap();
        store
            .upsert_triples(doc_b, &[triple("list", "z", c3, doc_b)])
            .await
            .unwrap();

        let only_b = store
            .query_by_entities(&["list".to_string()], Some(doc_b), 10)
            .await
            .unwrap();
        assert_eq!(only_b, vec![c3]);

        let capped = store
            .query_by_entities(&["list".to_string()], None, 2)
            .await
            .unwrap();
        assert_eq!(capped.len(), 2);

        assert_eq!(store.clear(doc_a).await.unwrap(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_entities_match_nothing() {
        let doc = Uuid::new_v4();
        let triples = vec![triple("list", "x", Uuid::new_v4(), doc)];
        assert!(match_triples(triples.iter(), &["  ".to_string()], None, 5).is_empty());
    }
}
