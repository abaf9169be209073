use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::RecommendationCache;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{Recommendation, Report};
use crate::recommend;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Served from the cache without calling the engine.
    Cached(Recommendation),
    /// Freshly generated and written to the cache.
    Fresh(Recommendation),
    /// A newer request for the same report started while this one was in
    /// flight; the result was dropped and the cache left alone.
    Superseded,
}

impl Outcome {
    pub fn recommendation(&self) -> Option<&Recommendation> {
        match self {
            Self::Cached(rec) | Self::Fresh(rec) => Some(rec),
            Self::Superseded => None,
        }
    }
}

#[derive(Debug, Default)]
struct Generations {
    next: u64,
    latest: HashMap<Uuid, u64>,
}

pub struct RecommendationService<C> {
    cache: C,
    config: EngineConfig,
    generations: Mutex<Generations>,
}

impl<C: RecommendationCache> RecommendationService<C> {
    pub fn new(cache: C, config: EngineConfig) -> Self {
        Self {
            cache,
            config,
            generations: Mutex::new(Generations::default()),
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Report ids with a request still in flight.
    pub fn in_flight(&self) -> usize {
        self.generations().latest.len()
    }

    pub async fn cached_or_generate(&self, report: &Report) -> Result<Outcome> {
        if let Some(rec) = self.cache.get(report.id).await? {
            debug!(report_id = %report.id, "recommendation served from cache");
            return Ok(Outcome::Cached(rec));
        }
        self.regenerate(report).await
    }

    pub async fn regenerate(&self, report: &Report) -> Result<Outcome> {
        let generation = self.begin(report.id);
        debug!(report_id = %report.id, generation, "generating recommendation");

        let rec = match recommend::generate_recommendation(report, &self.config).await {
            Ok(rec) => rec,
            Err(err) => {
                self.finish(report.id, generation);
                return Err(err);
            }
        };

        if !self.is_current(report.id, generation) {
            warn!(
                report_id = %report.id,
                generation,
                "discarding superseded recommendation"
            );
            return Ok(Outcome::Superseded);
        }

        let stored = self.cache.put(report.id, &rec).await;
        self.finish(report.id, generation);
        stored?;

        info!(report_id = %report.id, urgency = %rec.urgency, "recommendation stored");
        Ok(Outcome::Fresh(rec))
    }

    fn generations(&self) -> std::sync::MutexGuard<'_, Generations> {
        self.generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Generation numbers are unique across the service, so a finished
    /// entry can be dropped without an older request matching a newer one.
    fn begin(&self, report_id: Uuid) -> u64 {
        let mut generations = self.generations();
        generations.next += 1;
        let generation = generations.next;
        generations.latest.insert(report_id, generation);
        generation
    }

    fn is_current(&self, report_id: Uuid, generation: u64) -> bool {
        self.generations().latest.get(&report_id).copied() == Some(generation)
    }

    fn finish(&self, report_id: Uuid, generation: u64) {
        let mut generations = self.generations();
        if generations.latest.get(&report_id).copied() == Some(generation) {
            generations.latest.remove(&report_id);
        }
    }
}
