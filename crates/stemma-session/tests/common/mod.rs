#![allow(dead_code)]

//! Shared harness for session integration tests.

use std::sync::Arc;
use stemma_core::{EntityKind, PersistenceGateway, RootRecord};
use stemma_session::{register_session, FeedbackRouter, Session, SessionScope, SharedSession};
use stemma_testkit::ScriptedGateway;

/// Gateway and router wired the way an embedding would wire them.
pub struct Harness {
    pub gateway: Arc<ScriptedGateway>,
    pub router: Arc<FeedbackRouter>,
}

impl Harness {
    pub fn new() -> Self {
        stemma_testkit::init_tracing();
        Self {
            gateway: Arc::new(ScriptedGateway::new()),
            router: Arc::new(FeedbackRouter::new()),
        }
    }

    fn dyn_gateway(&self) -> Arc<dyn PersistenceGateway> {
        Arc::clone(&self.gateway) as Arc<dyn PersistenceGateway>
    }

    /// A session on a fresh, never-saved person.
    pub fn new_person(&self) -> Session {
        Session::new_root(EntityKind::Person, None, self.dyn_gateway(), Arc::clone(&self.router))
            .expect("person is a root kind")
    }

    /// A session over a preloaded record.
    pub fn over(&self, record: RootRecord) -> Session {
        Session::from_record(
            record,
            SessionScope::default(),
            self.dyn_gateway(),
            Arc::clone(&self.router),
        )
    }

    /// A child session built from opener-produced parameters.
    pub fn child(&self, params: &stemma_session::ChildSurfaceParams) -> Session {
        Session::child(params, self.dyn_gateway(), Arc::clone(&self.router))
    }

    /// Share a session and register it as a feedback endpoint.
    pub async fn shared(&self, session: Session) -> SharedSession {
        let shared = Arc::new(async_lock::RwLock::new(session));
        register_session(&self.router, &shared).await;
        shared
    }
}
