//! Core trait abstractions for the offer watcher.
//!
//! These traits define the seams the embedding application provides:
//! a browser session, a seen-set store, an acceptance filter and
//! notification backends.

pub mod browser;
pub mod filter;
pub mod notifier;
pub mod store;
