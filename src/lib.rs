pub mod app_state;
pub mod config;
pub mod conversations;
pub mod db;
pub mod error;
pub mod handlers;
pub mod membership;
pub mod middlewares;
pub mod models;
pub mod queries;
pub mod routes;
pub mod utils;
pub mod websocket;

#[cfg(test)]
pub mod test_support;
