//! # cgbridge-server: REST bridge service
//!
//! HTTP front end for one live cloud-gaming session: screenshots via
//! `GET /screencap`, synthetic touch, mouse and keyboard input via `POST`
//! endpoints.
//!
//! ## Modules
//!
//! - **config**: TOML configuration with defaults for every field.
//! - **http**: axum router and error-to-status mapping.
//! - **signaling**: WebSocket signaling client.
//! - **token**: file-backed token store with first-run login prompt.
//! - **jpeg**: snapshot encoder.
//! - **media**: media subsystem of the stock build.
//! - **service**: listener + session orchestration and shutdown.

pub mod config;
pub mod http;
pub mod jpeg;
pub mod media;
pub mod service;
pub mod signaling;
pub mod token;
