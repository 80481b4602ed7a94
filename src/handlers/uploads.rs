use anyhow::anyhow;
use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::middlewares::auth::Actor;
use crate::models::messages::MessageType;
use crate::utils::uploads::{allowed_file, extension, infer_message_type, UPLOAD_URL_PREFIX};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub file_url: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
}

pub async fn upload_file(
    State(state): State<AppState>,
    Actor(user): Actor,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut file: Option<(String, axum::body::Bytes)> = None;
    let mut requested_type: Option<MessageType> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(anyhow!("Multipart error: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(anyhow!("Failed to read file: {}", e)))?;
                file = Some((filename, data));
            }
            "type" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(anyhow!("Failed to read type: {}", e)))?;
                if !value.trim().is_empty() {
                    requested_type = Some(value.parse().map_err(AppError::BadRequest)?);
                }
            }
            _ => {}
        }
    }

    let (filename, data) = file.ok_or_else(|| AppError::BadRequest(anyhow!("No file selected")))?;
    if filename.is_empty() {
        return Err(AppError::BadRequest(anyhow!("No file selected")));
    }

    let message_type = match requested_type {
        Some(MessageType::Text) => {
            return Err(AppError::BadRequest(anyhow!("Text is not a file type")))
        }
        Some(message_type) if allowed_file(&filename, message_type) => message_type,
        Some(_) => return Err(AppError::BadRequest(anyhow!("File type not allowed"))),
        None => infer_message_type(&filename)
            .ok_or_else(|| AppError::BadRequest(anyhow!("File type not allowed")))?,
    };

    // Stored under a random name; the client's filename only picks the extension.
    let ext = extension(&filename)
        .ok_or_else(|| AppError::BadRequest(anyhow!("File type not allowed")))?;
    let stored_name = format!("{}.{}", Uuid::new_v4().simple(), ext);

    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(|e| AppError::InternalServerError(anyhow!("Failed to prepare upload dir: {}", e)))?;
    tokio::fs::write(state.config.upload_dir.join(&stored_name), &data)
        .await
        .map_err(|e| AppError::InternalServerError(anyhow!("Failed to store file: {}", e)))?;

    tracing::info!(
        user_id = user.id,
        file = %stored_name,
        size = data.len(),
        message_type = ?message_type,
        "File uploaded"
    );

    Ok(Json(UploadResponse {
        success: true,
        file_url: format!("{}{}", UPLOAD_URL_PREFIX, stored_name),
        message_type,
    }))
}
