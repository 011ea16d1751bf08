//! # arc-cli
//!
//! Shared pieces of the `arcw` binary.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod cmd;
pub mod handler;
pub mod opts;
pub mod utils;
