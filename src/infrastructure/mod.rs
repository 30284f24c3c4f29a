//! Infrastructure: local database and event plumbing

pub mod database;
pub mod events;
