//! `wallet` host binary internals.
//!
//! The binary listens for the page bridge, restores or establishes the wallet
//! session through it, and prints session events. It also inspects and clears
//! the persisted session record.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
