//! final-cut-backend: chat and scoring relay for the Final Cut detective game.
//!
//! Sits between the game frontend and a hosted OpenAI-compatible LLM provider:
//!   - character chat is streamed back to the caller fragment by fragment
//!   - accusation reasoning is scored 0-100 with a motive/method/logic breakdown

pub mod config;
pub mod models;
pub mod scoring;
pub mod server;
pub mod upstream;
