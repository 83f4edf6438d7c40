//! HTTP server facing the game frontend.
//!
//! - [`routes`]: Router, shared state and handlers
//! - [`streaming`]: Plain-text streaming of chat replies
//! - [`error`]: Error responses
//! - [`extract`]: JSON body extraction with `detail` rejections

pub mod error;
pub mod extract;
pub mod routes;
pub mod streaming;
