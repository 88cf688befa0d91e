pub mod assets;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;
