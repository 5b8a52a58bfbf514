//! Scriptable in-memory persistence gateway for testing
//!
//! Assigns keys from a counter, records every call it receives, and can be
//! told to reject or drop the next request. Canonicalization is observable:
//! text fields come back trimmed, so a test can tell canonical values from
//! the optimistic ones a surface sent.

use async_lock::Mutex;
use async_trait::async_trait;
use stemma_core::{
    Candidate, EntityKind, FieldMap, FieldValue, GatewayError, Key, PersistenceGateway, SaveReply,
    SaveRequest,
};

/// One observed gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    /// `create_or_update` with the request as sent.
    Save(SaveRequest),
    /// `remove(kind, id)`.
    Remove(EntityKind, Key),
    /// `reorder(kind, owner, ordered_ids)`.
    Reorder(EntityKind, Key, Vec<Key>),
    /// `list_candidates(kind, filter)`.
    ListCandidates(EntityKind, String),
}

/// Failure the gateway should produce on its next request.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScriptedFailure {
    Reject(String),
    Drop,
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<RecordedCall>,
    next_failure: Option<ScriptedFailure>,
    next_key: u64,
    candidates: Vec<Candidate>,
}

/// In-memory gateway handler for testing.
#[derive(Debug)]
pub struct ScriptedGateway {
    inner: Mutex<Inner>,
    gate: std::sync::Arc<Mutex<()>>,
}

impl ScriptedGateway {
    /// A gateway assigning keys from 501 upward.
    pub fn new() -> Self {
        Self::starting_at(501)
    }

    /// A gateway assigning keys from `first_key` upward.
    pub fn starting_at(first_key: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_key: first_key,
                ..Inner::default()
            }),
            gate: std::sync::Arc::new(Mutex::new(())),
        }
    }

    /// Hold every save open until the returned guard is dropped.
    ///
    /// Requests are still recorded on arrival; only their replies are
    /// withheld, so a test can observe state mid-flight.
    pub async fn pause_saves(&self) -> async_lock::MutexGuardArc<()> {
        self.gate.lock_arc().await
    }

    /// Reject the next request with a business-rule message.
    pub async fn reject_next(&self, message: impl Into<String>) {
        self.inner.lock().await.next_failure = Some(ScriptedFailure::Reject(message.into()));
    }

    /// Drop the next request as if the service were unreachable.
    pub async fn drop_next(&self) {
        self.inner.lock().await.next_failure = Some(ScriptedFailure::Drop);
    }

    /// Stock the candidate list returned by lookups.
    pub async fn stock_candidates(&self, candidates: Vec<Candidate>) {
        self.inner.lock().await.candidates = candidates;
    }

    /// Everything the gateway has been asked to do, in order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Number of calls of any kind received so far.
    pub async fn call_count(&self) -> usize {
        self.inner.lock().await.calls.len()
    }

    /// Number of `create_or_update` calls received so far.
    pub async fn save_count(&self) -> usize {
        self.inner
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| matches!(call, RecordedCall::Save(_)))
            .count()
    }

    async fn take_failure(&self) -> Option<ScriptedFailure> {
        self.inner.lock().await.next_failure.take()
    }

    fn fail(failure: ScriptedFailure) -> GatewayError {
        match failure {
            ScriptedFailure::Reject(message) => GatewayError::rejected(message),
            ScriptedFailure::Drop => GatewayError::unreachable("no response"),
        }
    }

    fn canonicalize(fields: &FieldMap) -> FieldMap {
        fields
            .iter()
            .map(|(tag, value)| {
                let canonical = match value {
                    FieldValue::Text(text) => FieldValue::Text(text.trim().to_string()),
                    other => other.clone(),
                };
                (tag.clone(), canonical)
            })
            .collect()
    }
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceGateway for ScriptedGateway {
    async fn create_or_update(&self, request: SaveRequest) -> Result<SaveReply, GatewayError> {
        if let Some(failure) = self.take_failure().await {
            return Err(Self::fail(failure));
        }
        let id = {
            let mut inner = self.inner.lock().await;
            inner.calls.push(RecordedCall::Save(request.clone()));
            match request.id {
                Some(id) => id,
                None => {
                    let id = Key::new(inner.next_key);
                    inner.next_key += 1;
                    id
                }
            }
        };
        // Held only while a test has paused saves.
        let _pass = self.gate.lock().await;
        tracing::debug!(kind = %request.kind, %id, "scripted save");
        Ok(SaveReply {
            id,
            canonical_fields: Self::canonicalize(&request.fields),
        })
    }

    async fn remove(&self, kind: EntityKind, id: Key) -> Result<(), GatewayError> {
        if let Some(failure) = self.take_failure().await {
            return Err(Self::fail(failure));
        }
        self.inner.lock().await.calls.push(RecordedCall::Remove(kind, id));
        Ok(())
    }

    async fn reorder(
        &self,
        kind: EntityKind,
        owner: Key,
        ordered_ids: Vec<Key>,
    ) -> Result<(), GatewayError> {
        if let Some(failure) = self.take_failure().await {
            return Err(Self::fail(failure));
        }
        self.inner
            .lock()
            .await
            .calls
            .push(RecordedCall::Reorder(kind, owner, ordered_ids));
        Ok(())
    }

    async fn list_candidates(
        &self,
        kind: EntityKind,
        filter: &str,
    ) -> Result<Vec<Candidate>, GatewayError> {
        if let Some(failure) = self.take_failure().await {
            return Err(Self::fail(failure));
        }
        let mut inner = self.inner.lock().await;
        inner
            .calls
            .push(RecordedCall::ListCandidates(kind, filter.to_string()));
        let lowered = filter.to_lowercase();
        Ok(inner
            .candidates
            .iter()
            .filter(|candidate| candidate.label.to_lowercase().contains(&lowered))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn assigns_keys_and_canonicalizes_text() {
        let gateway = ScriptedGateway::new();
        let mut fields = FieldMap::new();
        fields.insert("surname".to_string(), FieldValue::from("  Janssen "));

        let reply = gateway
            .create_or_update(SaveRequest::root(EntityKind::Person, None, fields))
            .await
            .expect("save");
        assert_eq!(reply.id, Key::new(501));
        assert_eq!(
            reply
                .canonical_fields
                .get("surname")
                .and_then(FieldValue::as_text),
            Some("Janssen")
        );
        assert_eq!(gateway.save_count().await, 1);
    }

    #[tokio::test]
    async fn scripted_failures_consume_themselves() {
        let gateway = ScriptedGateway::new();
        gateway.reject_next("surname in use").await;

        let err = gateway
            .create_or_update(SaveRequest::root(EntityKind::Person, None, FieldMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { .. }));
        // The failure was one-shot and the failed call is not recorded.
        assert_eq!(gateway.call_count().await, 0);

        gateway
            .create_or_update(SaveRequest::root(EntityKind::Person, None, FieldMap::new()))
            .await
            .expect("save after failure");
        assert_eq!(gateway.call_count().await, 1);
    }
}
