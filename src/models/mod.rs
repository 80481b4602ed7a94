pub mod contacts;
pub mod groups;
pub mod messages;
pub mod reports;
pub mod sessions;
pub mod users;
pub mod websocket;
