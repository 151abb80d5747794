//! JSON command handlers for the front-end boundary.
//!
//! Handlers take the raw `arg0` payload the UI sends and return
//! `Result<Value, String>`.

pub mod registry;
