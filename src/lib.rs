//! Client for the CampusNet academic portal.
//!
//! Logs in through the portal's identity provider without a browser, keeps
//! the session alive across expiry, and turns portal pages into typed
//! records: the user's profile, their courses per semester, and weekly
//! schedule events.

pub mod cache;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod fmt;
pub mod json;
pub mod logging;
pub mod portal;
pub mod utils;

pub use cache::{Cache, InMemoryCache, JsonFileCache};
pub use portal::{CampusNetClient, PortalError};
