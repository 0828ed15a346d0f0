use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Answer, Question};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc;

pub type SubscriptionId = u64;

/// Complete question list as of one store revision. Every delivery carries
/// the whole ordered list, not a diff; applying it is a plain replacement.
#[derive(Debug, Clone)]
pub struct QuestionsSnapshot {
    pub subscription: SubscriptionId,
    pub questions: Vec<Question>,
}

/// Complete answer list for one question as of one store revision.
#[derive(Debug, Clone)]
pub struct AnswersSnapshot {
    pub subscription: SubscriptionId,
    pub question_id: i64,
    pub answers: Vec<Answer>,
}

pub type QuestionFeed = mpsc::UnboundedReceiver<QuestionsSnapshot>;
pub type AnswerFeed = mpsc::UnboundedReceiver<AnswersSnapshot>;

#[derive(Debug, Clone, Copy)]
pub struct StoreStats {
    pub question_subscribers: usize,
    pub answer_subscribers: usize,
}

#[derive(Default)]
struct SubscriberRegistry {
    next_id: SubscriptionId,
    questions: HashMap<SubscriptionId, mpsc::UnboundedSender<QuestionsSnapshot>>,
    answers: HashMap<SubscriptionId, AnswerSink>,
}

struct AnswerSink {
    question_id: i64,
    sender: mpsc::UnboundedSender<AnswersSnapshot>,
}

/// Handle for tearing down a live subscription. Cancellation is idempotent
/// and synchronous: once `cancel` returns, no further snapshot is produced
/// for this subscription. A snapshot already buffered on the channel may
/// still be observed afterwards; consumers check the subscription id on
/// each delivery before applying it.
pub struct SubscriptionHandle {
    id: SubscriptionId,
    registry: Weak<Mutex<SubscriberRegistry>>,
    cancelled: bool,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;

        if let Some(registry) = self.registry.upgrade() {
            if let Ok(mut registry) = registry.lock() {
                registry.questions.remove(&self.id);
                registry.answers.remove(&self.id);
            }
        }

        tracing::debug!("Cancelled subscription {}", self.id);
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Live feed over the question collection.
pub struct QuestionSubscription {
    handle: SubscriptionHandle,
    receiver: QuestionFeed,
}

impl QuestionSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.handle.id
    }

    pub async fn recv(&mut self) -> Option<QuestionsSnapshot> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<QuestionsSnapshot> {
        self.receiver.try_recv().ok()
    }

    pub fn cancel(&mut self) {
        self.handle.cancel();
    }

    pub fn split(self) -> (SubscriptionHandle, QuestionFeed) {
        (self.handle, self.receiver)
    }
}

/// Live feed over one question's answer sub-collection.
pub struct AnswerSubscription {
    handle: SubscriptionHandle,
    question_id: i64,
    receiver: AnswerFeed,
}

impl AnswerSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.handle.id
    }

    pub fn question_id(&self) -> i64 {
        self.question_id
    }

    pub async fn recv(&mut self) -> Option<AnswersSnapshot> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<AnswersSnapshot> {
        self.receiver.try_recv().ok()
    }

    pub fn cancel(&mut self) {
        self.handle.cancel();
    }

    pub fn split(self) -> (SubscriptionHandle, AnswerFeed) {
        (self.handle, self.receiver)
    }
}

/// The sole writer against the persistent collections. Every write is a
/// pure append followed by a full-snapshot fan-out to the matching live
/// subscriptions; confirmation reaches writers only through the feed.
pub struct BoardStore {
    database: Arc<Database>,
    registry: Arc<Mutex<SubscriberRegistry>>,
}

impl BoardStore {
    pub fn new(database: Arc<Database>) -> Self {
        Self {
            database,
            registry: Arc::new(Mutex::new(SubscriberRegistry::default())),
        }
    }

    pub fn create_question(&self, text: &str) -> AppResult<Question> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::EmptyText);
        }

        let mut question = Question::new(text.to_string());
        question.id = self.database.create_question(&question)?;

        self.notify_questions();
        Ok(question)
    }

    pub fn create_answer(&self, question_id: i64, text: &str) -> AppResult<Answer> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::EmptyText);
        }

        let mut answer = Answer::new(question_id, text.to_string());
        answer.id = self.database.create_answer(&answer)?;

        self.notify_answers(question_id);
        Ok(answer)
    }

    /// Opens a live feed over the question list. The current state is
    /// delivered immediately as the first snapshot; consumers render from
    /// it without a separate initial fetch.
    pub fn subscribe_questions(&self) -> AppResult<QuestionSubscription> {
        let questions = self.database.get_all_questions()?;
        let (sender, receiver) = mpsc::unbounded_channel();

        let id = {
            let mut registry = self.lock_registry()?;
            let id = registry.next_id;
            registry.next_id += 1;
            registry.questions.insert(id, sender.clone());
            id
        };

        let _ = sender.send(QuestionsSnapshot {
            subscription: id,
            questions,
        });

        tracing::debug!("Opened question subscription {}", id);
        Ok(QuestionSubscription {
            handle: SubscriptionHandle {
                id,
                registry: Arc::downgrade(&self.registry),
                cancelled: false,
            },
            receiver,
        })
    }

    /// Opens a live feed over one question's answers. Subscribing to a
    /// question the store does not know yet is allowed and yields an empty
    /// initial snapshot.
    pub fn subscribe_answers(&self, question_id: i64) -> AppResult<AnswerSubscription> {
        let answers = self.database.get_answers_for_question(question_id)?;
        let (sender, receiver) = mpsc::unbounded_channel();

        let id = {
            let mut registry = self.lock_registry()?;
            let id = registry.next_id;
            registry.next_id += 1;
            registry.answers.insert(
                id,
                AnswerSink {
                    question_id,
                    sender: sender.clone(),
                },
            );
            id
        };

        let _ = sender.send(AnswersSnapshot {
            subscription: id,
            question_id,
            answers,
        });

        tracing::debug!("Opened answer subscription {} for question {}", id, question_id);
        Ok(AnswerSubscription {
            handle: SubscriptionHandle {
                id,
                registry: Arc::downgrade(&self.registry),
                cancelled: false,
            },
            question_id,
            receiver,
        })
    }

    pub fn stats(&self) -> AppResult<StoreStats> {
        let registry = self.lock_registry()?;
        Ok(StoreStats {
            question_subscribers: registry.questions.len(),
            answer_subscribers: registry.answers.len(),
        })
    }

    fn notify_questions(&self) {
        let questions = match self.database.get_all_questions() {
            Ok(questions) => questions,
            Err(e) => {
                tracing::error!("Failed to read question snapshot: {e}");
                return;
            }
        };

        let mut registry = match self.registry.lock() {
            Ok(registry) => registry,
            Err(e) => {
                tracing::error!("Subscriber registry lock poisoned: {e}");
                return;
            }
        };

        // Send to all question subscribers
        let mut dead = Vec::new();
        for (id, sender) in &registry.questions {
            let delivery = QuestionsSnapshot {
                subscription: *id,
                questions: questions.clone(),
            };
            if sender.send(delivery).is_err() {
                tracing::warn!("Question subscriber {} is gone", id);
                dead.push(*id);
            }
        }

        // Remove dropped receivers
        for id in dead {
            registry.questions.remove(&id);
        }
    }

    fn notify_answers(&self, question_id: i64) {
        let answers = match self.database.get_answers_for_question(question_id) {
            Ok(answers) => answers,
            Err(e) => {
                tracing::error!("Failed to read answer snapshot: {e}");
                return;
            }
        };

        let mut registry = match self.registry.lock() {
            Ok(registry) => registry,
            Err(e) => {
                tracing::error!("Subscriber registry lock poisoned: {e}");
                return;
            }
        };

        // Send to the subscribers scoped to this question
        let mut dead = Vec::new();
        for (id, sink) in &registry.answers {
            if sink.question_id != question_id {
                continue;
            }
            let delivery = AnswersSnapshot {
                subscription: *id,
                question_id,
                answers: answers.clone(),
            };
            if sink.sender.send(delivery).is_err() {
                tracing::warn!("Answer subscriber {} is gone", id);
                dead.push(*id);
            }
        }

        for id in dead {
            registry.answers.remove(&id);
        }
    }

    fn lock_registry(&self) -> AppResult<MutexGuard<'_, SubscriberRegistry>> {
        self.registry
            .lock()
            .map_err(|e| AppError::Internal(format!("Failed to acquire registry lock: {e}")))
    }
}
