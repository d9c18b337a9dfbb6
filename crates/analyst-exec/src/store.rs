//! Per-session artifact store
//!
//! Keyed by step id; one instance per session, so keys are session-scoped
//! by construction. Artifacts from prior plan runs remain addressable (for
//! "show me that chart again" follow-ups) until the session is evicted.
//! Re-running a plan overwrites the artifacts for the same step identities
//! instead of accumulating unboundedly.

use crate::artifact::Artifact;
use analyst_plan::StepId;
use dashmap::DashMap;
use parking_lot::RwLock;

/// Keyed storage of step outputs for one session
#[derive(Debug, Default)]
pub struct ArtifactStore {
    inner: DashMap<StepId, Artifact>,
    /// Step ids in first-stored order; re-puts keep their position
    order: RwLock<Vec<StepId>>,
}

impl ArtifactStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or overwrite) the artifact for its step
    pub fn put(&self, artifact: Artifact) {
        let id = artifact.step_id.clone();
        let existed = self.inner.insert(id.clone(), artifact).is_some();
        if !existed {
            self.order.write().push(id);
        }
    }

    /// Artifact by step id
    #[must_use]
    pub fn get(&self, id: &StepId) -> Option<Artifact> {
        self.inner.get(id).map(|a| a.clone())
    }

    /// All artifacts in first-stored order
    #[must_use]
    pub fn list(&self) -> Vec<Artifact> {
        self.order
            .read()
            .iter()
            .filter_map(|id| self.inner.get(id).map(|a| a.clone()))
            .collect()
    }

    /// Number of stored artifacts
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no artifacts are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop everything (dataset replacement invalidates prior outputs)
    pub fn clear(&self) {
        self.inner.clear();
        self.order.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactPayload;

    fn text_artifact(id: &str, body: &str) -> Artifact {
        Artifact::succeeded(id.into(), "narrate", ArtifactPayload::Text(body.into()))
    }

    #[test]
    fn put_get_roundtrip() {
        let store = ArtifactStore::new();
        store.put(text_artifact("s1", "hello"));
        let got = store.get(&"s1".into()).unwrap();
        assert!(got.status.is_success());
        assert!(store.get(&"nope".into()).is_none());
    }

    #[test]
    fn list_preserves_first_stored_order() {
        let store = ArtifactStore::new();
        store.put(text_artifact("b", "1"));
        store.put(text_artifact("a", "2"));
        let ids: Vec<_> = store.list().iter().map(|a| a.step_id.clone()).collect();
        assert_eq!(ids, vec!["b".into(), "a".into()]);
    }

    #[test]
    fn rerun_overwrites_without_accumulating() {
        let store = ArtifactStore::new();
        store.put(text_artifact("s1", "first"));
        store.put(text_artifact("s1", "second"));
        assert_eq!(store.len(), 1);
        match store.get(&"s1".into()).unwrap().payload {
            Some(ArtifactPayload::Text(t)) => assert_eq!(t, "second"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
