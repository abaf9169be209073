use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use uuid::Uuid;

use crate::error::Result;
use crate::models::Recommendation;

/// Storage for computed recommendations, keyed by report id. `put`
/// replaces whatever was stored before.
pub trait RecommendationCache: Send + Sync {
    fn get(
        &self,
        report_id: Uuid,
    ) -> impl Future<Output = Result<Option<Recommendation>>> + Send;

    fn put(
        &self,
        report_id: Uuid,
        recommendation: &Recommendation,
    ) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<Uuid, Recommendation>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecommendationCache for InMemoryCache {
    async fn get(&self, report_id: Uuid) -> Result<Option<Recommendation>> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(&report_id).cloned())
    }

    async fn put(&self, report_id: Uuid, recommendation: &Recommendation) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(report_id, recommendation.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Urgency;

    fn recommendation(summary: &str) -> Recommendation {
        Recommendation {
            summary: summary.to_string(),
            urgency: Urgency::Low,
            immediate_actions: vec!["Review report details carefully".to_string()],
            short_term_actions: Vec::new(),
            long_term_actions: Vec::new(),
            resources: Vec::new(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn put_overwrites_previous_entry() {
        let cache = InMemoryCache::new();
        let id = Uuid::new_v4();
        assert!(cache.get(id).await.unwrap().is_none());

        cache.put(id, &recommendation("first")).await.unwrap();
        cache.put(id, &recommendation("second")).await.unwrap();

        let stored = cache.get(id).await.unwrap().unwrap();
        assert_eq!(stored.summary, "second");
        assert_eq!(cache.len(), 1);
    }
}
