pub mod admin;
pub mod auth;
pub mod chats;
pub mod contacts;
pub mod dashboard;
pub mod groups;
pub mod reports;
pub mod uploads;
