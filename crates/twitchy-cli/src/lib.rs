//! # Twitchy CLI
//!
//! Command-line front end for the Twitch Helix API built on `twitchy-sdk`.
//! It obtains and inspects access tokens and runs simple Helix lookups.

pub mod cli;
pub mod error;
pub mod logging;
pub mod output;

pub use cli::*;
pub use error::*;
