//! Resume and background-context state.
//!
//! One resume slot and one context value per server, constructed at startup
//! and shared through `AppState`. The slot lives in memory and is mirrored to
//! SQLite so it survives restarts; the context is always written to SQLite
//! before the in-memory copy changes.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{info, warn};

use crate::models::context::{BackgroundContext, ContextRow};
use crate::models::resume::{ResumeDocument, SavedResumeRow, SourceFormat};

pub mod handlers;
pub mod upload;

#[derive(Debug, Default)]
struct ResumeSlot {
    document: Option<Arc<ResumeDocument>>,
    /// Bumped on every load so a slow durable save cannot mark a newer
    /// upload as persisted.
    revision: u64,
}

/// Held for the duration of one tailoring run; dropping it (including when the
/// request future is cancelled) lets the next run start.
#[derive(Debug)]
pub struct TailoringGuard {
    _permit: OwnedMutexGuard<()>,
}

pub struct ResumeStore {
    pool: SqlitePool,
    slot: RwLock<ResumeSlot>,
    context: RwLock<BackgroundContext>,
    tailoring: Arc<Mutex<()>>,
}

impl ResumeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            slot: RwLock::new(ResumeSlot::default()),
            context: RwLock::new(BackgroundContext::default()),
            tailoring: Arc::new(Mutex::new(())),
        }
    }

    /// Loads the persisted resume (marked `persisted`) and the background
    /// context into memory. Returns whether a resume was restored.
    pub async fn restore(&self) -> Result<bool, sqlx::Error> {
        let context: Option<ContextRow> =
            sqlx::query_as("SELECT body, updated_at FROM background_context WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        if let Some(row) = context {
            *self.context.write().await = row.into();
        }

        let saved: Option<SavedResumeRow> = sqlx::query_as(
            "SELECT source_text, source_format, original_filename, saved_at \
             FROM saved_resume WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = saved else {
            return Ok(false);
        };
        let Some(format) = SourceFormat::parse(&row.source_format) else {
            warn!(format = %row.source_format, "ignoring saved resume with unknown format");
            return Ok(false);
        };

        let document = ResumeDocument {
            source_text: row.source_text,
            source_format: format,
            original_filename: row.original_filename,
            persisted: true,
            loaded_at: row.saved_at,
        };
        info!(filename = %document.original_filename, "restored saved resume");
        let mut slot = self.slot.write().await;
        slot.revision += 1;
        slot.document = Some(Arc::new(document));
        Ok(true)
    }

    /// Replaces the slot. The new document is not persisted until
    /// [`persist_resume`](Self::persist_resume) succeeds for the returned revision.
    pub async fn load_resume(&self, mut document: ResumeDocument) -> u64 {
        document.persisted = false;
        let mut slot = self.slot.write().await;
        slot.revision += 1;
        slot.document = Some(Arc::new(document));
        slot.revision
    }

    /// Writes the resume loaded at `revision` to SQLite and marks it persisted.
    /// Returns `false` when a newer upload replaced it in the meantime.
    pub async fn persist_resume(&self, revision: u64) -> Result<bool, sqlx::Error> {
        let document = {
            let slot = self.slot.read().await;
            match &slot.document {
                Some(doc) if slot.revision == revision => Arc::clone(doc),
                _ => return Ok(false),
            }
        };

        sqlx::query(
            "INSERT INTO saved_resume (id, source_text, source_format, original_filename, saved_at) \
             VALUES (1, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                source_text = excluded.source_text, \
                source_format = excluded.source_format, \
                original_filename = excluded.original_filename, \
                saved_at = excluded.saved_at",
        )
        .bind(&document.source_text)
        .bind(document.source_format.as_str())
        .bind(&document.original_filename)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let mut slot = self.slot.write().await;
        if slot.revision != revision {
            return Ok(false);
        }
        let mut persisted = (*document).clone();
        persisted.persisted = true;
        slot.document = Some(Arc::new(persisted));
        Ok(true)
    }

    pub async fn get_resume(&self) -> Option<Arc<ResumeDocument>> {
        self.slot.read().await.document.clone()
    }

    pub async fn get_context(&self) -> BackgroundContext {
        self.context.read().await.clone()
    }

    /// Durably replaces the background context.
    pub async fn save_context(&self, text: String) -> Result<BackgroundContext, sqlx::Error> {
        let updated_at = Utc::now();
        sqlx::query(
            "INSERT INTO background_context (id, body, updated_at) VALUES (1, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        )
        .bind(&text)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        let context = BackgroundContext {
            text,
            updated_at: Some(updated_at),
        };
        *self.context.write().await = context.clone();
        Ok(context)
    }

    /// Claims the tailoring loop, or `None` while another run holds it.
    pub fn begin_tailoring(&self) -> Option<TailoringGuard> {
        Arc::clone(&self.tailoring)
            .try_lock_owned()
            .ok()
            .map(|permit| TailoringGuard { _permit: permit })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
