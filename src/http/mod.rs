//! HTTP API for driving capture sessions
//!
//! - POST /sessions - Create a session
//! - GET /sessions/:id - Session snapshot
//! - POST /sessions/:id/{preview,retry,mode} - Device control
//! - POST /sessions/:id/record/{start,stop,cancel}, /rerecord - Recording control
//! - POST /sessions/:id/upload - Upload and attach
//! - POST /sessions/:id/playback/{toggle,seek} - Transport
//! - DELETE /sessions/:id/recording - Delete the stored recording
//! - DELETE /sessions/:id - Tear down
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{AppState, SessionEntry};
