use crate::models::messages::MessageType;

/// URL prefix under which stored uploads are served.
pub const UPLOAD_URL_PREFIX: &str = "/static/uploads/";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt"];

fn allowed_extensions(message_type: MessageType) -> &'static [&'static str] {
    match message_type {
        MessageType::Image => IMAGE_EXTENSIONS,
        MessageType::Video => VIDEO_EXTENSIONS,
        MessageType::Audio => AUDIO_EXTENSIONS,
        MessageType::Document => DOCUMENT_EXTENSIONS,
        MessageType::Text => &[],
    }
}

/// Lowercased extension after the last dot, if any.
pub fn extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn allowed_file(filename: &str, message_type: MessageType) -> bool {
    extension(filename)
        .map(|ext| allowed_extensions(message_type).contains(&ext.as_str()))
        .unwrap_or(false)
}

/// The attachment type a filename belongs to, judged by extension.
pub fn infer_message_type(filename: &str) -> Option<MessageType> {
    [
        MessageType::Image,
        MessageType::Video,
        MessageType::Audio,
        MessageType::Document,
    ]
    .into_iter()
    .find(|message_type| allowed_file(filename, *message_type))
}

/// Whether `path` points at a file this server stored.
pub fn is_upload_url(path: &str) -> bool {
    path.strip_prefix(UPLOAD_URL_PREFIX)
        .map(|name| !name.is_empty() && !name.contains('/') && !name.contains(".."))
        .unwrap_or(false)
}
