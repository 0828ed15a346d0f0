use crate::error::AppResult;
use crate::models::{Answer, Question, QuestionView};
use crate::store::{
    AnswerFeed, AnswersSnapshot, BoardStore, QuestionFeed, QuestionsSnapshot, SubscriptionHandle,
};
use std::sync::Arc;

/// One client's materialized view of the board.
///
/// Holds the current question list and, for the single question whose panel
/// is open, that question's answers. Both are fed exclusively by
/// full-snapshot deliveries from the store: applying a snapshot replaces
/// the corresponding state wholesale, which makes re-delivery and
/// reordering harmless.
pub struct LiveQueryCache {
    store: Arc<BoardStore>,
    questions: Vec<Question>,
    questions_sub: SubscriptionHandle,
    answers: Option<OpenAnswers>,
}

struct OpenAnswers {
    subscription: SubscriptionHandle,
    question_id: i64,
    answers: Vec<Answer>,
}

impl LiveQueryCache {
    /// Opens the question-list subscription that lives as long as the
    /// cache. The returned feed delivers every snapshot, starting with the
    /// store's current state.
    pub fn mount(store: Arc<BoardStore>) -> AppResult<(Self, QuestionFeed)> {
        let subscription = store.subscribe_questions()?;
        let (handle, feed) = subscription.split();
        let cache = Self {
            store,
            questions: Vec::new(),
            questions_sub: handle,
            answers: None,
        };
        Ok((cache, feed))
    }

    /// Switches the single answer subscription to the given question. Any
    /// prior answer subscription is cancelled before the new one opens, so
    /// two are never live at once.
    pub fn open_answers(&mut self, question_id: i64) -> AppResult<AnswerFeed> {
        self.close_answers();

        let subscription = self.store.subscribe_answers(question_id)?;
        let (handle, feed) = subscription.split();
        self.answers = Some(OpenAnswers {
            subscription: handle,
            question_id,
            answers: Vec::new(),
        });
        Ok(feed)
    }

    pub fn close_answers(&mut self) {
        if let Some(mut open) = self.answers.take() {
            open.subscription.cancel();
        }
    }

    /// Replaces the whole question list. The feed is authoritative and
    /// complete, so there is nothing to merge.
    pub fn apply_questions(&mut self, snapshot: QuestionsSnapshot) {
        self.questions = snapshot.questions;
    }

    /// Replaces the open question's answers. Deliveries whose subscription
    /// id is not the currently active one are late arrivals from a
    /// cancelled feed and are dropped. Returns whether the snapshot was
    /// applied.
    pub fn apply_answers(&mut self, snapshot: AnswersSnapshot) -> bool {
        match &mut self.answers {
            Some(open) if open.subscription.id() == snapshot.subscription => {
                open.answers = snapshot.answers;
                true
            }
            _ => {
                tracing::debug!(
                    "Dropping stale answer snapshot from subscription {}",
                    snapshot.subscription
                );
                false
            }
        }
    }

    /// Materializes the view sent to the client. Answers are only ever
    /// attached to a question present in the list, so the view cannot show
    /// an answer without its parent.
    pub fn materialize(&self, open_question_id: Option<i64>) -> Vec<QuestionView> {
        self.questions
            .iter()
            .map(|question| {
                let is_open = open_question_id == Some(question.id);
                let answers = if is_open {
                    self.answers
                        .as_ref()
                        .filter(|open| open.question_id == question.id)
                        .map(|open| open.answers.clone())
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                QuestionView {
                    id: question.id,
                    text: question.text.clone(),
                    created_at: question.created_at,
                    is_open,
                    answers,
                }
            })
            .collect()
    }

    /// Cancels every live subscription. Called at view teardown; dropping
    /// the cache has the same effect.
    pub fn unmount(&mut self) {
        self.close_answers();
        self.questions_sub.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use tempfile::TempDir;

    fn test_store() -> (Arc<BoardStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let database = Arc::new(Database::new(&temp_dir.path().join("board.db")).unwrap());
        (Arc::new(BoardStore::new(database)), temp_dir)
    }

    #[test]
    fn applying_the_same_snapshot_twice_is_idempotent() {
        let (store, _dir) = test_store();
        store.create_question("What is X?").unwrap();

        let (mut cache, mut feed) = LiveQueryCache::mount(Arc::clone(&store)).unwrap();
        let snapshot = feed.try_recv().unwrap();

        cache.apply_questions(snapshot.clone());
        let first = cache.materialize(None);
        cache.apply_questions(snapshot);
        let second = cache.materialize(None);

        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[test]
    fn answers_are_only_attached_to_a_present_parent() {
        let (store, _dir) = test_store();
        let question = store.create_question("What is X?").unwrap();
        store.create_answer(question.id, "X is Z").unwrap();

        let (mut cache, mut feed) = LiveQueryCache::mount(Arc::clone(&store)).unwrap();
        cache.apply_questions(feed.try_recv().unwrap());

        let mut answer_feed = cache.open_answers(question.id).unwrap();
        assert!(cache.apply_answers(answer_feed.try_recv().unwrap()));

        let view = cache.materialize(Some(question.id));
        assert_eq!(view.len(), 1);
        assert!(view[0].is_open);
        assert_eq!(view[0].answers.len(), 1);

        // A question list that no longer carries the parent drops the
        // answers from the materialized view as well.
        cache.apply_questions(QuestionsSnapshot {
            subscription: 0,
            questions: Vec::new(),
        });
        let view = cache.materialize(Some(question.id));
        assert!(view.is_empty());
    }

    #[test]
    fn stale_answer_snapshots_are_dropped() {
        let (store, _dir) = test_store();
        let q1 = store.create_question("What is X?").unwrap();
        let q2 = store.create_question("How does Y work?").unwrap();

        let (mut cache, _feed) = LiveQueryCache::mount(Arc::clone(&store)).unwrap();
        let mut stale_feed = cache.open_answers(q1.id).unwrap();
        let stale = stale_feed.try_recv().unwrap();

        // Switching panels invalidates the first subscription
        let _fresh_feed = cache.open_answers(q2.id).unwrap();
        assert!(!cache.apply_answers(stale));
    }
}
