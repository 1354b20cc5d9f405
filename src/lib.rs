//! Client for an AI web-testing agent.
//!
//! The agent runs a workflow of phases (exploration, design, generation,
//! verification, plus two refinements) and streams events back over a
//! websocket. This crate tracks the workflow as a [`session::SessionState`]
//! folded from those events, sends phase commands with the ordering side
//! effects applied locally, and fetches the verification report over HTTP.

pub mod artifacts;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod phase;
pub mod protocol;
pub mod report;
pub mod router;
pub mod runtime;
pub mod session;
pub mod ui;
