use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::assets::AssetStore;
use crate::mailer::ChangeRecord;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub mail: mpsc::Sender<ChangeRecord>,
    pub assets: Arc<dyn AssetStore>,
}

impl AppState {
    pub fn new(pool: PgPool, mail: mpsc::Sender<ChangeRecord>, assets: Arc<dyn AssetStore>) -> Self {
        Self { pool, mail, assets }
    }

    /// Queue a change record for the email worker. Enqueue failures are
    /// logged, not surfaced; email delivery never fails an API request.
    pub fn queue_email(&self, record: ChangeRecord) {
        if let Err(e) = self.mail.try_send(record) {
            tracing::warn!(error = %e, "email queue full or closed, dropping record");
        }
    }
}
