// HTTP handlers, one module per resource
pub mod assets;
pub mod auth;
pub mod batches;
pub mod courses;
pub mod enrollments;
pub mod health;
pub mod lessons;
pub mod modules;
pub mod students;
pub mod users;
