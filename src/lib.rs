// src/lib.rs

//! JOBO Bot Library
//!
//! Scrapes ticket listings, detects new and changed events against a local
//! store and announces them on a Telegram channel.

pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod sources;
pub mod storage;
pub mod utils;
