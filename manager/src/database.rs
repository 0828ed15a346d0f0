use crate::error::{AppError, AppResult};
use crate::models::{Answer, Question};
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub type DbConnection = Arc<Mutex<Connection>>;

pub struct Database {
    connection: DbConnection,
}

impl Database {
    pub fn new(db_path: &PathBuf) -> AppResult<Self> {
        // Ensure the database directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;

        // Enable foreign key constraints (SQLite3 has them disabled by default)
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        let database = Database {
            connection: Arc::new(Mutex::new(conn)),
        };

        database.run_migrations()?;

        Ok(database)
    }

    fn run_migrations(&self) -> AppResult<()> {
        let conn = self
            .connection
            .lock()
            .map_err(|e| AppError::Internal(format!("Failed to acquire database lock: {e}")))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Index for recency-ordered snapshots
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_questions_created_at ON questions(created_at)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (question_id) REFERENCES questions (id)
            )",
            [],
        )?;

        // Index for per-question answer snapshots
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_answers_question_id ON answers(question_id)",
            [],
        )?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    pub fn create_question(&self, question: &Question) -> AppResult<i64> {
        let conn = self
            .connection
            .lock()
            .map_err(|e| AppError::Internal(format!("Failed to acquire database lock: {e}")))?;

        conn.execute(
            "INSERT INTO questions (text, created_at) VALUES (?, ?)",
            params![question.text, question.created_at],
        )?;

        let question_id = conn.last_insert_rowid();
        tracing::info!("Created question: {}", question_id);
        Ok(question_id)
    }

    pub fn create_answer(&self, answer: &Answer) -> AppResult<i64> {
        let conn = self
            .connection
            .lock()
            .map_err(|e| AppError::Internal(format!("Failed to acquire database lock: {e}")))?;

        conn.execute(
            "INSERT INTO answers (question_id, text, created_at) VALUES (?, ?, ?)",
            params![answer.question_id, answer.text, answer.created_at],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                AppError::QuestionNotFound(answer.question_id)
            }
            _ => AppError::Database(e),
        })?;

        let answer_id = conn.last_insert_rowid();
        tracing::info!(
            "Created answer: {} for question {}",
            answer_id,
            answer.question_id
        );
        Ok(answer_id)
    }

    /// Full question list, newest first. Equal timestamps fall back to the
    /// insertion order the store assigned, never to id string comparison.
    pub fn get_all_questions(&self) -> AppResult<Vec<Question>> {
        let conn = self
            .connection
            .lock()
            .map_err(|e| AppError::Internal(format!("Failed to acquire database lock: {e}")))?;

        let mut stmt = conn.prepare(
            "SELECT id, text, created_at FROM questions ORDER BY created_at DESC, id DESC",
        )?;

        let question_iter = stmt.query_map([], |row| {
            Ok(Question {
                id: row.get(0)?,
                text: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;

        let mut questions = Vec::new();
        for question in question_iter {
            questions.push(question?);
        }

        Ok(questions)
    }

    pub fn get_question_by_id(&self, id: i64) -> AppResult<Question> {
        let conn = self
            .connection
            .lock()
            .map_err(|e| AppError::Internal(format!("Failed to acquire database lock: {e}")))?;

        let mut stmt = conn.prepare("SELECT id, text, created_at FROM questions WHERE id = ?")?;

        let question = stmt
            .query_row([id], |row| {
                Ok(Question {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => AppError::QuestionNotFound(id),
                _ => AppError::Database(e),
            })?;

        Ok(question)
    }

    pub fn get_answers_for_question(&self, question_id: i64) -> AppResult<Vec<Answer>> {
        let conn = self
            .connection
            .lock()
            .map_err(|e| AppError::Internal(format!("Failed to acquire database lock: {e}")))?;

        let mut stmt = conn.prepare(
            "SELECT id, question_id, text, created_at FROM answers
             WHERE question_id = ? ORDER BY created_at DESC, id DESC",
        )?;

        let answer_iter = stmt.query_map([question_id], |row| {
            Ok(Answer {
                id: row.get(0)?,
                question_id: row.get(1)?,
                text: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;

        let mut answers = Vec::new();
        for answer in answer_iter {
            answers.push(answer?);
        }

        Ok(answers)
    }
}
