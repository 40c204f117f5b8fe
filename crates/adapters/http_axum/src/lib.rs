//! # vigil-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the host-facing **JSON API** of the event manager:
//!   - `GET  /health`
//!   - `GET  /api/state?new_triggers_only=true`
//!   - `POST /api/commands/{name}`
//! - Map application errors into HTTP status codes with a JSON body
//!
//! ## Dependency rule
//! Depends on `vigil-app` (for the [`EventManager`](vigil_app::supervisor::EventManager))
//! and `vigil-domain` (for the reported types). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
