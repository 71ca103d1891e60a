use super::GenerationRecord;
use crate::{Error, Result};
use libsql::{Builder, Connection, Database, Value};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub struct HistoryStorage {
    db: Option<Database>,
    conn: Option<Connection>,
    // In-memory fallback storage
    fallback: Arc<Mutex<Vec<GenerationRecord>>>,
}

impl HistoryStorage {
    pub async fn new(db_path: &str) -> Result<Self> {
        let mut storage = Self {
            db: None,
            conn: None,
            fallback: Arc::new(Mutex::new(Vec::new())),
        };

        // Try to initialize database
        match storage.init_database(db_path).await {
            Ok(()) => {
                info!("History database initialized: {}", db_path);
            }
            Err(e) => {
                warn!(
                    "History database initialization failed, using in-memory fallback: {}",
                    e
                );
            }
        }

        Ok(storage)
    }

    pub fn is_persistent(&self) -> bool {
        self.db.is_some() && self.conn.is_some()
    }

    async fn init_database(&mut self, db_path: &str) -> Result<()> {
        let db = Builder::new_local(db_path).build().await?;

        // One connection for the lifetime of the store; each `:memory:`
        // connection would otherwise be a separate database.
        let conn = db.connect()?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS generations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                generation_id TEXT NOT NULL,
                prompt TEXT NOT NULL,
                prediction_id TEXT,
                status TEXT NOT NULL,
                output_url TEXT,
                error TEXT,
                created_at DATETIME NOT NULL
            )
            "#,
            (),
        )
        .await?;

        self.db = Some(db);
        self.conn = Some(conn);
        Ok(())
    }

    pub async fn save(&self, record: GenerationRecord) -> Result<()> {
        // Try database first
        if let Some(ref conn) = self.conn {
            match self.save_to_db(conn, &record).await {
                Ok(()) => {
                    debug!("Generation saved to database: {}", record.generation_id);
                    return Ok(());
                }
                Err(e) => {
                    warn!("Failed to save to database, using fallback: {}", e);
                }
            }
        }

        self.save_to_fallback(record)
    }

    async fn save_to_db(&self, conn: &Connection, record: &GenerationRecord) -> Result<()> {
        conn.execute(
            "INSERT INTO generations (generation_id, prompt, prediction_id, status, output_url, error, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
            vec![
                Value::from(record.generation_id.clone()),
                Value::from(record.prompt.clone()),
                optional_text(&record.prediction_id),
                Value::from(record.status.clone()),
                optional_text(&record.output_url),
                optional_text(&record.error),
                Value::from(record.created_at.to_rfc3339()),
            ],
        )
        .await?;
        Ok(())
    }

    fn save_to_fallback(&self, record: GenerationRecord) -> Result<()> {
        let mut fallback = self
            .fallback
            .lock()
            .map_err(|e| Error::internal(format!("Mutex lock failed: {e}")))?;
        fallback.push(record);
        Ok(())
    }

    /// Most recent generations first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<GenerationRecord>> {
        if let Some(ref conn) = self.conn {
            match self.recent_from_db(conn, limit).await {
                Ok(records) => {
                    debug!("Retrieved {} generations from database", records.len());
                    return Ok(records);
                }
                Err(e) => {
                    warn!("Failed to read from database, using fallback: {}", e);
                }
            }
        }

        self.recent_from_fallback(limit)
    }

    async fn recent_from_db(&self, conn: &Connection, limit: usize) -> Result<Vec<GenerationRecord>> {
        let mut rows = conn
            .query(
                "SELECT id, generation_id, prompt, prediction_id, status, output_url, error, created_at FROM generations ORDER BY id DESC LIMIT ?",
                [limit as i64],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            let created_at_str: String = row.get(7)?;
            let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
                .map_err(|e| Error::internal(format!("Failed to parse timestamp: {e}")))?
                .with_timezone(&chrono::Utc);

            records.push(GenerationRecord {
                id: Some(row.get(0)?),
                generation_id: row.get(1)?,
                prompt: row.get(2)?,
                prediction_id: optional_from(row.get_value(3)?),
                status: row.get(4)?,
                output_url: optional_from(row.get_value(5)?),
                error: optional_from(row.get_value(6)?),
                created_at,
            });
        }

        Ok(records)
    }

    fn recent_from_fallback(&self, limit: usize) -> Result<Vec<GenerationRecord>> {
        let fallback = self
            .fallback
            .lock()
            .map_err(|e| Error::internal(format!("Mutex lock failed: {e}")))?;

        let records: Vec<GenerationRecord> = fallback.iter().rev().take(limit).cloned().collect();

        debug!("Retrieved {} generations from fallback", records.len());
        Ok(records)
    }
}

fn optional_text(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text.clone()),
        None => Value::Null,
    }
}

fn optional_from(value: Value) -> Option<String> {
    match value {
        Value::Text(text) => Some(text),
        _ => None,
    }
}
