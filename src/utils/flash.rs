use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::AppResult;

const FLASH_SESSION_KEY: &str = "_flashes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
}

/// A one-shot status message carried across a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

pub async fn push(session: &Session, level: FlashLevel, message: impl Into<String>) -> AppResult<()> {
    let mut flashes = session
        .get::<Vec<Flash>>(FLASH_SESSION_KEY)
        .await?
        .unwrap_or_default();

    flashes.push(Flash {
        level,
        message: message.into(),
    });

    session.insert(FLASH_SESSION_KEY, flashes).await?;
    Ok(())
}

/// Pending messages, oldest first. Clears them from the session.
pub async fn take(session: &Session) -> AppResult<Vec<Flash>> {
    let flashes = session.remove::<Vec<Flash>>(FLASH_SESSION_KEY).await?;
    Ok(flashes.unwrap_or_default())
}
