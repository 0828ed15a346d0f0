use crate::cache::LiveQueryCache;
use crate::error::AppResult;
use crate::models::QuestionView;
use crate::store::{AnswerFeed, AnswersSnapshot, BoardStore, QuestionFeed, QuestionsSnapshot};
use std::sync::Arc;

/// Per-client interaction state machine.
///
/// Owns which question's answer panel is open (at most one at a time) and
/// routes submissions to the store. Writes are fire-and-forget: the
/// controller never inserts optimistically and never blocks on a write;
/// the authoritative update arrives through the subscription feed.
pub struct DiscussionController {
    store: Arc<BoardStore>,
    cache: LiveQueryCache,
    open_question_id: Option<i64>,
}

impl DiscussionController {
    /// Creates the controller for one client session and opens its
    /// question-list feed. The controller lives until `unmount`.
    pub fn mount(store: Arc<BoardStore>) -> AppResult<(Self, QuestionFeed)> {
        let (cache, feed) = LiveQueryCache::mount(Arc::clone(&store))?;
        let controller = Self {
            store,
            cache,
            open_question_id: None,
        };
        Ok((controller, feed))
    }

    pub fn open_question_id(&self) -> Option<i64> {
        self.open_question_id
    }

    /// Toggles a question's answer panel. Closing returns `None`; opening
    /// cancels any prior answer subscription first and returns the new
    /// feed for the caller's event loop to consume.
    pub fn toggle(&mut self, question_id: i64) -> AppResult<Option<AnswerFeed>> {
        if self.open_question_id == Some(question_id) {
            self.open_question_id = None;
            self.cache.close_answers();
            return Ok(None);
        }

        self.open_question_id = None;
        let feed = self.cache.open_answers(question_id)?;
        self.open_question_id = Some(question_id);
        Ok(Some(feed))
    }

    /// Blank text produces no write and no state change.
    pub fn submit_question(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        if let Err(e) = self.store.create_question(text) {
            tracing::warn!("Question write failed: {e}");
        }
    }

    /// Submits an answer to the open question, then closes the panel
    /// immediately, before any confirmation of the write comes back.
    /// Ignored when no panel is open or the text is blank.
    pub fn submit_answer(&mut self, text: &str) {
        let Some(question_id) = self.open_question_id else {
            return;
        };
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        if let Err(e) = self.store.create_answer(question_id, text) {
            tracing::warn!("Answer write failed for question {question_id}: {e}");
        }

        self.open_question_id = None;
        self.cache.close_answers();
    }

    pub fn apply_questions(&mut self, snapshot: QuestionsSnapshot) {
        self.cache.apply_questions(snapshot);
    }

    pub fn apply_answers(&mut self, snapshot: AnswersSnapshot) -> bool {
        self.cache.apply_answers(snapshot)
    }

    /// The view pushed to the client: questions with a derived `is_open`
    /// flag and the open question's answers.
    pub fn view(&self) -> Vec<QuestionView> {
        self.cache.materialize(self.open_question_id)
    }

    pub fn unmount(&mut self) {
        self.open_question_id = None;
        self.cache.unmount();
    }
}
