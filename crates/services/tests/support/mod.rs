//! Shared fakes for session integration tests: a scripted quiz service, a
//! recording navigation host, and a stack builder over the in-memory store.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::StatusCode;

use quiz_core::Clock;
use quiz_core::model::{AnswerSheet, AttemptId, Question, QuestionId, Quiz, QuizId};
use services::{AttemptSessionService, NavigationHost, QuizService, QuizServiceError};
use storage::{InMemorySnapshotStore, SnapshotRepository, SnapshotStore, StorageError};

pub fn quiz_id() -> QuizId {
    QuizId::new(1)
}

pub fn timed_quiz(minutes: u32) -> Quiz {
    Quiz::new(quiz_id(), "Algebra Basics", Some(minutes), 3).unwrap()
}

pub fn untimed_quiz() -> Quiz {
    Quiz::new(quiz_id(), "Take-home", None, 3).unwrap()
}

pub fn questions() -> Vec<Question> {
    vec![
        Question::new(
            QuestionId::new(1),
            "2+2?",
            vec!["A".into(), "B".into()],
        )
        .unwrap(),
        Question::new(
            QuestionId::new(2),
            "3*3?",
            vec!["A".into(), "B".into()],
        )
        .unwrap(),
    ]
}

/// Scripted in-memory quiz service counting every call.
pub struct FakeQuizService {
    quiz: Quiz,
    questions: Vec<Question>,
    pub start_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    fail_starts: AtomicUsize,
    fail_submits: AtomicUsize,
    pub submitted: Mutex<Option<(AttemptId, AnswerSheet)>>,
}

impl FakeQuizService {
    pub fn new(quiz: Quiz, questions: Vec<Question>) -> Self {
        Self {
            quiz,
            questions,
            start_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            fail_starts: AtomicUsize::new(0),
            fail_submits: AtomicUsize::new(0),
            submitted: Mutex::new(None),
        }
    }

    /// Fail the next `count` start calls with a 500.
    pub fn fail_next_starts(&self, count: usize) {
        self.fail_starts.store(count, Ordering::SeqCst);
    }

    /// Fail the next `count` submit calls with a 500.
    pub fn fail_next_submits(&self, count: usize) {
        self.fail_submits.store(count, Ordering::SeqCst);
    }

    fn take_scripted_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl QuizService for FakeQuizService {
    async fn fetch_quiz(&self, _quiz_id: QuizId) -> Result<Quiz, QuizServiceError> {
        Ok(self.quiz.clone())
    }

    async fn fetch_questions(&self, _quiz_id: QuizId) -> Result<Vec<Question>, QuizServiceError> {
        Ok(self.questions.clone())
    }

    async fn start_attempt(&self, _quiz_id: QuizId) -> Result<AttemptId, QuizServiceError> {
        if Self::take_scripted_failure(&self.fail_starts) {
            return Err(QuizServiceError::HttpStatus(
                StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
        let n = self.start_calls.fetch_add(1, Ordering::SeqCst);
        Ok(AttemptId::new(500 + n as u64))
    }

    async fn submit_attempt(
        &self,
        attempt_id: AttemptId,
        answers: &AnswerSheet,
    ) -> Result<(), QuizServiceError> {
        if Self::take_scripted_failure(&self.fail_submits) {
            return Err(QuizServiceError::HttpStatus(
                StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        *self.submitted.lock().unwrap() = Some((attempt_id, answers.clone()));
        Ok(())
    }
}

/// Store whose writes can be scripted to fail; reads and deletes pass
/// through to the in-memory map.
#[derive(Clone, Default)]
pub struct FailingSnapshotStore {
    inner: InMemorySnapshotStore,
    fail_sets: Arc<AtomicUsize>,
}

impl FailingSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` write calls.
    pub fn fail_next_sets(&self, count: usize) {
        self.fail_sets.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotStore for FailingSnapshotStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let scripted = self
            .fail_sets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted {
            return Err(StorageError::Connection("storage unavailable".into()));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}

/// Navigation host counting guard registrations and recording routes.
#[derive(Default)]
pub struct RecordingNavigationHost {
    pub checkpoints: AtomicUsize,
    pub registers: AtomicUsize,
    pub unregisters: AtomicUsize,
    pub routes: Mutex<Vec<String>>,
}

impl NavigationHost for RecordingNavigationHost {
    fn push_checkpoint(&self) {
        self.checkpoints.fetch_add(1, Ordering::SeqCst);
    }

    fn register_exit_guard(&self) {
        self.registers.fetch_add(1, Ordering::SeqCst);
    }

    fn unregister_exit_guard(&self) {
        self.unregisters.fetch_add(1, Ordering::SeqCst);
    }

    fn navigate_to(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}

/// Fully faked service stack sharing one in-memory store.
pub struct Stack {
    pub service: AttemptSessionService,
    pub quizzes: Arc<FakeQuizService>,
    pub navigation: Arc<RecordingNavigationHost>,
    pub store: InMemorySnapshotStore,
    pub snapshots: SnapshotRepository,
}

/// Like [`Stack`], but over a store whose writes can be made to fail.
pub struct FailingStack {
    pub service: AttemptSessionService,
    pub store: FailingSnapshotStore,
    pub snapshots: SnapshotRepository,
}

pub fn failing_stack(clock: Clock, quiz: Quiz) -> FailingStack {
    let quizzes = Arc::new(FakeQuizService::new(quiz, questions()));
    let navigation = Arc::new(RecordingNavigationHost::default());
    let store = FailingSnapshotStore::new();
    let snapshots = SnapshotRepository::new(Arc::new(store.clone()));
    let service = AttemptSessionService::new(
        clock,
        quizzes as Arc<dyn QuizService>,
        snapshots.clone(),
        navigation as Arc<dyn NavigationHost>,
    );
    FailingStack {
        service,
        store,
        snapshots,
    }
}

pub fn stack(clock: Clock, quiz: Quiz) -> Stack {
    let quizzes = Arc::new(FakeQuizService::new(quiz, questions()));
    let navigation = Arc::new(RecordingNavigationHost::default());
    let store = InMemorySnapshotStore::new();
    let snapshots = SnapshotRepository::new(Arc::new(store.clone()));
    let service = AttemptSessionService::new(
        clock,
        Arc::clone(&quizzes) as Arc<dyn QuizService>,
        snapshots.clone(),
        Arc::clone(&navigation) as Arc<dyn NavigationHost>,
    );
    Stack {
        service,
        quizzes,
        navigation,
        store,
        snapshots,
    }
}
