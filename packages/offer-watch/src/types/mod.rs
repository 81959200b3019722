//! Offer record model and configuration types.

pub mod config;
pub mod item;
pub mod journey;
pub mod offer;
