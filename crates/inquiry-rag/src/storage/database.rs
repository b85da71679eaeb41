//! SQLite record store for documents, chunks, quizzes, conversations, and
//! knowledge-graph triples

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::graph_store::{match_triples, GraphStore};
use crate::types::{
    Chunk, CorrectAnswer, Difficulty, Document, GraphTriple, Question, QuestionOption,
    QuestionType, Quiz, Role, Turn,
};

/// Create/read/bulk-delete access to the records the RAG core touches
///
/// Chunks are never updated in place: a document's chunks are replaced as a
/// whole. Quizzes are written all-or-nothing.
pub trait RecordStore: Send + Sync {
    fn insert_document(&self, document: &Document) -> Result<()>;

    fn get_document(&self, id: Uuid) -> Result<Option<Document>>;

    fn list_documents(&self) -> Result<Vec<Document>>;

    fn set_processed(&self, id: Uuid, processed: bool) -> Result<()>;

    /// Delete a document's chunks and insert the new set in one transaction
    fn replace_chunks(&self, document_id: Uuid, chunks: &[Chunk]) -> Result<()>;

    fn delete_chunks(&self, document_id: Uuid) -> Result<usize>;

    /// Chunks ordered by ordinal
    fn get_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>>;

    /// Persist a quiz and all its questions atomically
    fn save_quiz(&self, quiz: &Quiz) -> Result<()>;

    fn get_quiz(&self, id: Uuid) -> Result<Option<Quiz>>;

    fn create_conversation(&self, title: &str) -> Result<Uuid>;

    fn append_turn(&self, conversation_id: Uuid, turn: &Turn) -> Result<()>;

    /// Turns in the order they were written
    fn get_turns(&self, conversation_id: Uuid) -> Result<Vec<Turn>>;
}

/// SQLite-backed record store
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::persistence(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate(true)?;
        Ok(db)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            Error::persistence(format!("Failed to open in-memory database: {}", e))
        })?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate(false)?;
        Ok(db)
    }

    fn migrate(&self, on_disk: bool) -> Result<()> {
        let conn = self.conn.lock();

        if on_disk {
            conn.execute_batch(
                r#"
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                "#,
            )
            .map_err(|e| Error::persistence(format!("Failed to set pragmas: {}", e)))?;
        }

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                processed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                ordinal INTEGER NOT NULL,
                content TEXT NOT NULL,
                char_start INTEGER,
                char_end INTEGER,
                UNIQUE(document_id, ordinal)
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id);

            CREATE TABLE IF NOT EXISTS quizzes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                document_id TEXT,
                difficulty TEXT NOT NULL,
                total_questions INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS questions (
                id TEXT PRIMARY KEY,
                quiz_id TEXT NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
                question_order INTEGER NOT NULL CHECK (question_order >= 1),
                question_type TEXT NOT NULL CHECK (question_type IN ('MC', 'MCM', 'TF', 'FB', 'SA')),
                content TEXT NOT NULL CHECK (length(content) > 0),
                options TEXT NOT NULL,
                correct_answer TEXT NOT NULL,
                explanation TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                knowledge_points TEXT NOT NULL,
                UNIQUE(quiz_id, question_order)
            );

            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                content TEXT NOT NULL,
                document_id TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_turns_conversation ON turns(conversation_id);

            CREATE TABLE IF NOT EXISTS graph_triples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id TEXT NOT NULL,
                chunk_id TEXT NOT NULL,
                subject TEXT NOT NULL,
                relation TEXT NOT NULL,
                object TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_graph_triples_document ON graph_triples(document_id);
            "#,
        )
        .map_err(|e| Error::persistence(format!("Failed to run migrations: {}", e)))?;

        tracing::debug!("Database migrations complete");
        Ok(())
    }

    /// Number of triples stored for a document
    pub fn triple_count(&self, document_id: Uuid) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM graph_triples WHERE document_id = ?1",
            params![document_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn load_triples(&self, document_id: Option<Uuid>) -> Result<Vec<GraphTriple>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT document_id, chunk_id, subject, relation, object FROM graph_triples
            WHERE ?1 IS NULL OR document_id = ?1
            ORDER BY id
            "#,
        )?;

        let triples = stmt
            .query_map(params![document_id.map(|id| id.to_string())], |row| {
                Ok(GraphTriple {
                    document_id: parse_uuid(row, 0)?,
                    chunk_id: parse_uuid(row, 1)?,
                    subject: row.get(2)?,
                    relation: row.get(3)?,
                    object: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(triples)
    }

    fn load_questions(conn: &Connection, quiz_id: Uuid) -> Result<Vec<Question>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, question_order, question_type, content, options, correct_answer,
                   explanation, difficulty, knowledge_points
            FROM questions WHERE quiz_id = ?1 ORDER BY question_order
            "#,
        )?;

        let rows = stmt
            .query_map(params![quiz_id.to_string()], |row| {
                Ok((
                    parse_uuid(row, 0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut questions = Vec::with_capacity(rows.len());
        for (id, order, qtype, content, options, answer, explanation, difficulty, points) in rows {
            let question_type = QuestionType::from_code(&qtype)
                .ok_or_else(|| Error::persistence(format!("unknown question type '{}'", qtype)))?;
            let options: Vec<QuestionOption> = serde_json::from_str(&options)?;
            let correct_answer: CorrectAnswer = serde_json::from_str(&answer)?;
            let knowledge_points: Vec<String> = serde_json::from_str(&points)?;

            questions.push(Question {
                id,
                quiz_id,
                order: order as u32,
                question_type,
                content,
                options,
                correct_answer,
                explanation,
                difficulty: Difficulty::parse(&difficulty).unwrap_or_default(),
                knowledge_points,
            });
        }

        Ok(questions)
    }
}

impl RecordStore for SqliteStore {
    fn insert_document(&self, document: &Document) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO documents (id, title, content, processed, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                document.id.to_string(),
                document.title,
                document.content,
                document.processed,
                document.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        let conn = self.conn.lock();
        let document = conn
            .query_row(
                "SELECT id, title, content, processed, created_at FROM documents WHERE id = ?1",
                params![id.to_string()],
                row_to_document,
            )
            .optional()?;
        Ok(document)
    }

    fn list_documents(&self) -> Result<Vec<Document>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, content, processed, created_at FROM documents ORDER BY created_at",
        )?;
        let documents = stmt
            .query_map([], row_to_document)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(documents)
    }

    fn set_processed(&self, id: Uuid, processed: bool) -> Result<()> {
        let conn = self.conn.lock();
        let count = conn.execute(
            "UPDATE documents SET processed = ?2 WHERE id = ?1",
            params![id.to_string(), processed],
        )?;
        if count == 0 {
            return Err(Error::DocumentNotFound(id.to_string()));
        }
        Ok(())
    }

    fn replace_chunks(&self, document_id: Uuid, chunks: &[Chunk]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM chunks WHERE document_id = ?1",
            params![document_id.to_string()],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO chunks (id, document_id, ordinal, content, char_start, char_end)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;

            for chunk in chunks {
                if chunk.document_id != document_id {
                    return Err(Error::precondition(format!(
                        "chunk {} belongs to document {}",
                        chunk.id, chunk.document_id
                    )));
                }
                stmt.execute(params![
                    chunk.id.to_string(),
                    document_id.to_string(),
                    chunk.ordinal as i64,
                    chunk.text,
                    chunk.char_start.map(|v| v as i64),
                    chunk.char_end.map(|v| v as i64),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_chunks(&self, document_id: Uuid) -> Result<usize> {
        let conn = self.conn.lock();
        let count = conn.execute(
            "DELETE FROM chunks WHERE document_id = ?1",
            params![document_id.to_string()],
        )?;
        Ok(count)
    }

    fn get_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, document_id, ordinal, content, char_start, char_end
            FROM chunks WHERE document_id = ?1 ORDER BY ordinal
            "#,
        )?;

        let chunks = stmt
            .query_map(params![document_id.to_string()], |row| {
                Ok(Chunk {
                    id: parse_uuid(row, 0)?,
                    document_id: parse_uuid(row, 1)?,
                    ordinal: row.get::<_, i64>(2)? as u32,
                    text: row.get(3)?,
                    char_start: row.get::<_, Option<i64>>(4)?.map(|v| v as usize),
                    char_end: row.get::<_, Option<i64>>(5)?.map(|v| v as usize),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(chunks)
    }

    fn save_quiz(&self, quiz: &Quiz) -> Result<()> {
        if quiz.total_questions as usize != quiz.questions.len() {
            return Err(Error::precondition(format!(
                "quiz declares {} questions but has {}",
                quiz.total_questions,
                quiz.questions.len()
            )));
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO quizzes (id, title, document_id, difficulty, total_questions, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                quiz.id.to_string(),
                quiz.title,
                quiz.document_id.map(|id| id.to_string()),
                quiz.difficulty.as_str(),
                quiz.total_questions as i64,
                quiz.created_at.to_rfc3339(),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO questions (
                    id, quiz_id, question_order, question_type, content, options,
                    correct_answer, explanation, difficulty, knowledge_points
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )?;

            for question in &quiz.questions {
                stmt.execute(params![
                    question.id.to_string(),
                    quiz.id.to_string(),
                    question.order as i64,
                    question.question_type.code(),
                    question.content,
                    serde_json::to_string(&question.options)?,
                    serde_json::to_string(&question.correct_answer)?,
                    question.explanation,
                    question.difficulty.as_str(),
                    serde_json::to_string(&question.knowledge_points)?,
                ])?;
            }
        }

        // Dropping the transaction on any error above rolls everything back
        tx.commit()?;
        tracing::info!(
            "Saved quiz {} with {} questions",
            quiz.id,
            quiz.total_questions
        );
        Ok(())
    }

    fn get_quiz(&self, id: Uuid) -> Result<Option<Quiz>> {
        let conn = self.conn.lock();
        let header = conn
            .query_row(
                r#"
                SELECT title, document_id, difficulty, total_questions, created_at
                FROM quizzes WHERE id = ?1
                "#,
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((title, document_id, difficulty, total, created_at)) = header else {
            return Ok(None);
        };

        let questions = Self::load_questions(&conn, id)?;

        Ok(Some(Quiz {
            id,
            title,
            document_id: document_id.and_then(|s| Uuid::parse_str(&s).ok()),
            difficulty: Difficulty::parse(&difficulty).unwrap_or_default(),
            total_questions: total as u32,
            questions,
            created_at: parse_timestamp(&created_at),
        }))
    }

    fn create_conversation(&self, title: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO conversations (id, title, created_at) VALUES (?1, ?2, ?3)",
            params![id.to_string(), title, Utc::now().to_rfc3339()],
        )?;
        Ok(id)
    }

    fn append_turn(&self, conversation_id: Uuid, turn: &Turn) -> Result<()> {
        if turn.is_summary {
            return Err(Error::precondition(
                "summary turns exist only in working copies",
            ));
        }

        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO turns (conversation_id, role, content, document_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                conversation_id.to_string(),
                match turn.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                turn.content,
                turn.document_id.map(|id| id.to_string()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_turns(&self, conversation_id: Uuid) -> Result<Vec<Turn>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT role, content, document_id FROM turns
            WHERE conversation_id = ?1 ORDER BY id
            "#,
        )?;

        let rows = stmt
            .query_map(params![conversation_id.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(role, content, document_id)| {
                let role = Role::parse(&role)
                    .ok_or_else(|| Error::persistence(format!("unknown role '{}'", role)))?;
                Ok(Turn {
                    role,
                    content,
                    document_id: document_id.and_then(|s| Uuid::parse_str(&s).ok()),
                    is_summary: false,
                })
            })
            .collect()
    }
}

#[async_trait]
impl GraphStore for SqliteStore {
    async fn upsert_triples(&self, document_id: Uuid, triples: &[GraphTriple]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO graph_triples (document_id, chunk_id, subject, relation, object)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for triple in triples {
                stmt.execute(params![
                    document_id.to_string(),
                    triple.chunk_id.to_string(),
                    triple.subject,
                    triple.relation,
                    triple.object,
                ])?;
            }
        }
        tx.commit()?;
        Ok(triples.len())
    }

    async fn query_by_entities(
        &self,
        entities: &[String],
        document_id: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Uuid>> {
        let triples = self.load_triples(document_id)?;
        Ok(match_triples(&triples, entities, document_id, limit))
    }

    async fn clear(&self, document_id: Uuid) -> Result<usize> {
        let conn = self.conn.lock();
        let count = conn.execute(
            "DELETE FROM graph_triples WHERE document_id = ?1",
            params![document_id.to_string()],
        )?;
        Ok(count)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

// Helper functions

fn parse_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    let created_at: String = row.get(4)?;
    Ok(Document {
        id: parse_uuid(row, 0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        processed: row.get(3)?,
        created_at: parse_timestamp(&created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuestionDraft;
    use serde_json::json;

    fn store_with_document() -> (SqliteStore, Document) {
        let store = SqliteStore::in_memory().unwrap();
        let doc = Document::new("Python Basics", "Lists hold mixed types.");
        store.insert_document(&doc).unwrap();
        (store, doc)
    }

    #[test]
    fn test_document_roundtrip() {
        let (store, doc) = store_with_document();

        let loaded = store.get_document(doc.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Python Basics");
        assert!(!loaded.processed);

        store.set_processed(doc.id, true).unwrap();
        assert!(store.get_document(doc.id).unwrap().unwrap().processed);
        assert!(store.get_document(Uuid::new_v4()).unwrap().is_none());
        assert!(matches!(
            store.set_processed(Uuid::new_v4(), true),
            Err(Error::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_replace_chunks_regenerates() {
        let (store, doc) = store_with_document();

        let first = vec![
            Chunk::new(doc.id, 0, "a"),
            Chunk::new(doc.id, 1, "b"),
            Chunk::new(doc.id, 2, "c"),
        ];
        store.replace_chunks(doc.id, &first).unwrap();
        assert_eq!(store.get_chunks(doc.id).unwrap().len(), 3);

        let second = vec![Chunk::new(doc.id, 0, "x").with_offsets(0, 1)];
        store.replace_chunks(doc.id, &second).unwrap();

        let chunks = store.get_chunks(doc.id).unwrap();
        assert_eq!(chunks, second);
    }

    #[test]
    fn test_quiz_roundtrip() {
        let (store, doc) = store_with_document();
        let drafts: Vec<QuestionDraft> = vec![
            serde_json::from_value(json!({
                "content": "Which type is mutable?",
                "type": "MC",
                "options": ["tuple", "list"],
                "correct_answer": "B"
            }))
            .unwrap(),
            serde_json::from_value(json!({
                "content": "Lists can hold mixed types.",
                "type": "TF",
                "correct_answer": "yes"
            }))
            .unwrap(),
        ];
        let quiz = Quiz::assemble("Python Basics - lists", Some(doc.id), Difficulty::Easy, drafts);
        store.save_quiz(&quiz).unwrap();

        let loaded = store.get_quiz(quiz.id).unwrap().unwrap();
        assert_eq!(loaded.total_questions, 2);
        assert_eq!(loaded.questions.len(), 2);
        assert_eq!(
            loaded.questions.iter().map(|q| q.order).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(loaded.questions[0].options[1].id, "B");
        assert_eq!(
            loaded.questions[1].correct_answer,
            CorrectAnswer::Single("true".to_string())
        );
    }

    #[test]
    fn test_failed_quiz_write_rolls_back() {
        let (store, _) = store_with_document();
        let draft: QuestionDraft = serde_json::from_value(json!({
            "content": "Lists are ordered.",
            "type": "TF",
            "correct_answer": "true"
        }))
        .unwrap();
        let mut quiz = Quiz::assemble("t", None, Difficulty::Medium, vec![draft.clone(), draft]);
        // Duplicate order violates UNIQUE(quiz_id, question_order)
        quiz.questions[1].order = 1;

        assert!(store.save_quiz(&quiz).is_err());
        assert!(store.get_quiz(quiz.id).unwrap().is_none());
    }

    #[test]
    fn test_turns_keep_order() {
        let store = SqliteStore::in_memory().unwrap();
        let conversation = store.create_conversation("lists").unwrap();
        store
            .append_turn(conversation, &Turn::user("What is a list?"))
            .unwrap();
        store
            .append_turn(conversation, &Turn::assistant("An ordered collection."))
            .unwrap();
        assert!(store
            .append_turn(conversation, &Turn::summary("no"))
            .is_err());

        let turns = store.get_turns(conversation).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].content, "An ordered collection.");
    }

    #[tokio::test]
    async fn test_graph_store_contract() {
        let (store, doc) = store_with_document();
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();
        let triple = |s: &str, o: &str, chunk| GraphTriple {
            subject: s.to_string(),
            relation: "relates".to_string(),
            object: o.to_string(),
            chunk_id: chunk,
            document_id: doc.id,
        };

        store
            .upsert_triples(
                doc.id,
                &[
                    triple("Python", "dynamic typing", c1),
                    triple("List", "mixed types", c2),
                    triple("list comprehension", "List", c2),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .query_by_entities(&["list".to_string()], Some(doc.id), 10)
            .await
            .unwrap();
        assert_eq!(hits, vec![c2]);

        let hits = store
            .query_by_entities(&["PYTHON".to_string(), "list".to_string()], None, 1)
            .await
            .unwrap();
        assert_eq!(hits, vec![c1]);

        assert_eq!(store.clear(doc.id).await.unwrap(), 3);
        assert_eq!(store.triple_count(doc.id).unwrap(), 0);
    }
}
