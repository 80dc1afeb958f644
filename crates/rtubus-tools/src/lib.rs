//! Shared plumbing for the rtubus command-line tools.

#![forbid(unsafe_code)]

pub mod common;
