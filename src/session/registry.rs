// src/session/registry.rs

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, RwLock},
    time::{Instant, interval_at},
};
use uuid::Uuid;

use super::{
    SessionError,
    controller::{Advance, QuizSession, SessionState, SessionView, SubmitTrigger, Tick},
};
use crate::{config::SessionSettings, models::participant::RegistrationForm, store::Stores};

/// A session shared between request handlers and its countdown task.
/// Holding the lock serializes user actions with timer ticks.
pub type SessionHandle = Arc<Mutex<QuizSession>>;

struct SessionEntry {
    handle: SessionHandle,
    last_active: Instant,
}

/// Live participant sessions keyed by id.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    settings: SessionSettings,
}

impl SessionRegistry {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            settings,
        }
    }

    /// Creates a session and loads the active quiz into it. Sessions that
    /// fail to load are not kept.
    pub async fn open(&self, stores: &Stores) -> Result<SessionView, SessionError> {
        self.prune().await;

        let mut session = QuizSession::new(self.settings.clone());
        session.load(stores.questions.as_ref()).await?;
        let view = session.view();

        self.sessions.write().await.insert(
            session.id(),
            SessionEntry {
                handle: Arc::new(Mutex::new(session)),
                last_active: Instant::now(),
            },
        );
        Ok(view)
    }

    pub async fn get(&self, id: Uuid) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(|entry| entry.handle.clone())
            .ok_or(SessionError::SessionNotFound)
    }

    pub async fn view(&self, id: Uuid) -> Result<SessionView, SessionError> {
        let handle = self.get(id).await?;
        let session = handle.lock().await;
        Ok(session.view())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Registers the participant and starts the countdown.
    pub async fn register(
        &self,
        id: Uuid,
        form: RegistrationForm,
        stores: &Stores,
    ) -> Result<SessionView, SessionError> {
        let handle = self.get(id).await?;
        let view = {
            let mut session = handle.lock().await;
            session.register(form, stores).await?;
            session.view()
        };

        if let Some(entry) = self.sessions.write().await.get_mut(&id) {
            entry.last_active = Instant::now();
        }
        spawn_countdown(handle, stores.clone());
        Ok(view)
    }

    pub async fn select_answer(
        &self,
        id: Uuid,
        question_id: Uuid,
        option: String,
    ) -> Result<SessionView, SessionError> {
        let handle = self.get(id).await?;
        let mut session = handle.lock().await;
        session.select_answer(question_id, option)?;
        Ok(session.view())
    }

    pub async fn previous(&self, id: Uuid) -> Result<SessionView, SessionError> {
        let handle = self.get(id).await?;
        let mut session = handle.lock().await;
        session.previous()?;
        Ok(session.view())
    }

    /// May submit; runs detached from the request so a dropped connection
    /// cannot interrupt a write.
    pub async fn next(&self, id: Uuid, stores: &Stores) -> Result<SessionView, SessionError> {
        let handle = self.get(id).await?;
        let stores = stores.clone();
        detached(async move {
            let mut session = handle.lock().await;
            if let Advance::Submitted(receipt) = session.next(&stores).await? {
                tracing::debug!("Session {} completed as {}", session.id(), receipt.reference_code);
            }
            Ok(session.view())
        })
        .await
    }

    pub async fn submit(&self, id: Uuid, stores: &Stores) -> Result<SessionView, SessionError> {
        let handle = self.get(id).await?;
        let stores = stores.clone();
        detached(async move {
            let mut session = handle.lock().await;
            session.submit(&stores, SubmitTrigger::User).await?;
            Ok(session.view())
        })
        .await
    }

    /// Drops sessions idle for longer than the configured time to live.
    /// A participant who is answering or submitting is never dropped, and
    /// neither is a session whose lock is currently held.
    async fn prune(&self) {
        let ttl = Duration::from_secs(self.settings.ttl_seconds);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            if entry.last_active.elapsed() < ttl {
                return true;
            }
            match entry.handle.try_lock() {
                Ok(session) => matches!(
                    session.state(),
                    SessionState::Answering | SessionState::Submitting
                ),
                Err(_) => true,
            }
        });

        let dropped = before - sessions.len();
        if dropped > 0 {
            tracing::debug!("Pruned {} expired sessions", dropped);
        }
    }
}

async fn detached<F, T>(task: F) -> Result<T, SessionError>
where
    F: Future<Output = Result<T, SessionError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(task)
        .await
        .map_err(|e| SessionError::Service(e.to_string()))?
}

/// Ticks once per second until the session leaves `Answering`. When the
/// budget runs out the current answers are submitted.
fn spawn_countdown(handle: SessionHandle, stores: Stores) {
    tokio::spawn(async move {
        let period = Duration::from_secs(1);
        let mut ticker = interval_at(Instant::now() + period, period);

        loop {
            ticker.tick().await;
            let mut session = handle.lock().await;

            match session.tick() {
                Tick::Running(_) => {}
                Tick::Idle => break,
                Tick::Expired => {
                    tracing::info!("Session {} ran out of time, submitting", session.id());
                    if let Err(e) = session.submit(&stores, SubmitTrigger::Timeout).await {
                        tracing::warn!(
                            "Timed submission for session {} failed: {}",
                            session.id(),
                            e
                        );
                    }
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SubmissionStore};

    fn stores_with_quiz() -> (Arc<MemoryStore>, Stores) {
        let store = Arc::new(MemoryStore::new());
        store.seed_quiz(
            "Kerala GK",
            &[
                ("Capital?", &["Kochi", "Thiruvananthapuram"], "Thiruvananthapuram"),
                ("River?", &["Periyar", "Ganga"], "Periyar"),
            ],
        );
        let stores = Stores {
            questions: store.clone(),
            scoring: store.clone(),
            submissions: store.clone(),
            links: store.clone(),
            admin: store.clone(),
        };
        (store, stores)
    }

    fn form() -> RegistrationForm {
        RegistrationForm {
            participant_name: "Anu".to_string(),
            mobile_number: "9876543210".to_string(),
            panchayath: "Kumily".to_string(),
            referrer_mobile: None,
            share_code: None,
        }
    }

    fn settings(seconds_per_question: u32) -> SessionSettings {
        SessionSettings {
            seconds_per_question,
            ..SessionSettings::default()
        }
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let registry = SessionRegistry::new(SessionSettings::default());
        assert!(matches!(
            registry.view(Uuid::new_v4()).await,
            Err(SessionError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn failed_load_is_not_kept() {
        let stores = Stores::memory(MemoryStore::new());
        let registry = SessionRegistry::new(SessionSettings::default());

        assert!(matches!(
            registry.open(&stores).await,
            Err(SessionError::QuizUnavailable)
        ));
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_submits_when_time_runs_out() {
        let (store, stores) = stores_with_quiz();
        let registry = SessionRegistry::new(settings(5));

        let opened = registry.open(&stores).await.unwrap();
        let id = opened.session_id;
        let view = registry.register(id, form(), &stores).await.unwrap();
        assert_eq!(view.remaining_seconds, 10);

        let question = view.current_question.unwrap();
        registry
            .select_answer(id, question.id, question.options[0].clone())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(4)).await;
        let midway = registry.view(id).await.unwrap();
        assert_eq!(midway.state, SessionState::Answering);
        assert!(midway.remaining_seconds < 10);

        tokio::time::sleep(Duration::from_secs(7)).await;
        let done = registry.view(id).await.unwrap();
        assert_eq!(done.state, SessionState::Completed);
        assert_eq!(done.remaining_seconds, 0);

        let rows = store.list(None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].answers.0.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_stops_after_manual_submission() {
        let (store, stores) = stores_with_quiz();
        let registry = SessionRegistry::new(settings(30));

        let id = registry.open(&stores).await.unwrap().session_id;
        let mut view = registry.register(id, form(), &stores).await.unwrap();

        while view.state == SessionState::Answering {
            let question = view.current_question.clone().unwrap();
            registry
                .select_answer(id, question.id, question.options[1].clone())
                .await
                .unwrap();
            view = registry.next(id, &stores).await.unwrap();
        }
        assert_eq!(view.state, SessionState::Completed);
        let remaining = view.remaining_seconds;

        tokio::time::sleep(Duration::from_secs(120)).await;

        let after = registry.view(id).await.unwrap();
        assert_eq!(after.remaining_seconds, remaining);
        assert_eq!(store.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_sessions_are_pruned_on_open() {
        let (_, stores) = stores_with_quiz();
        let registry = SessionRegistry::new(SessionSettings {
            ttl_seconds: 60,
            ..SessionSettings::default()
        });

        let stale = registry.open(&stores).await.unwrap().session_id;
        tokio::time::advance(Duration::from_secs(61)).await;
        registry.open(&stores).await.unwrap();

        assert_eq!(registry.len().await, 1);
        assert!(registry.get(stale).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn answering_session_outlives_the_ttl() {
        let (store, stores) = stores_with_quiz();
        let registry = SessionRegistry::new(SessionSettings {
            seconds_per_question: 60,
            ttl_seconds: 100,
            ..SessionSettings::default()
        });

        let id = registry.open(&stores).await.unwrap().session_id;
        tokio::time::advance(Duration::from_secs(90)).await;
        let view = registry.register(id, form(), &stores).await.unwrap();
        assert_eq!(view.remaining_seconds, 120);

        // Past the TTL counted from open, and past it again from registration
        tokio::time::sleep(Duration::from_secs(15)).await;
        registry.open(&stores).await.unwrap();
        tokio::time::sleep(Duration::from_secs(90)).await;
        registry.open(&stores).await.unwrap();

        let live = registry.view(id).await.unwrap();
        assert_eq!(live.state, SessionState::Answering);
        let question = live.current_question.unwrap();
        registry
            .select_answer(id, question.id, question.options[0].clone())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        let done = registry.view(id).await.unwrap();
        assert_eq!(done.state, SessionState::Completed);
        assert_eq!(store.list(None).await.unwrap()[0].answers.0.len(), 1);
    }
}
