//! Common test utilities and fixtures for lobby-relay integration tests
//!
//! This module provides:
//! - `TestRelay` for running a relay on an ephemeral port
//! - `RawPeer` for speaking the wire protocol frame by frame
//! - Lobby fixtures and a password-checking connect handler

#![allow(unused_imports)]
#![allow(dead_code)]


pub use test_relay::{duck, password_handler, RawPeer, TestRelay};
