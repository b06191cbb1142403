//! Conference event assistant
//!
//! Search over event documents held in a CouchDB-compatible database, the
//! REST surface the chat bot backend calls, and the websocket wire types
//! shared with the browser client.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod models;
pub mod search;

pub use error::{AppError, Result};
