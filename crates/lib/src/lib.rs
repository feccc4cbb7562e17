//! College webhook core library — config, intent table, Gemini client, text cleanup and
//! the fulfillment server, used by the CLI.

pub mod config;
pub mod init;
pub mod intent;
pub mod llm;
pub mod text;
pub mod webhook;
