//! Scancart client engine.
//!
//! This crate is the platform-independent core of the scancart mobile app:
//! session identity, the per-identity shopping cart, catalog lookups, and the
//! camera-scan-to-product pipeline. The presentation layer (screens, camera
//! capture, navigation) lives in the host app and talks to this crate through
//! [`state::AppState`].
//!
//! # Architecture
//!
//! Device-specific capabilities are injected behind trait seams:
//!
//! - [`http::HttpClient`] - backend API transport
//! - [`storage::KeyValueStore`] / [`storage::CredentialStore`] - durable
//!   app storage and the secure token store
//! - [`recognition::RecognitionService`] - the image recognition endpoint
//! - [`recognition::ImageTranscoder`] - platform JPEG re-encoding
//!
//! Production implementations backed by `reqwest` and the filesystem ship in
//! this crate; mobile hosts substitute their own adapters.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod http;
pub mod identity;
pub mod models;
pub mod recent;
pub mod recognition;
pub mod state;
pub mod storage;
