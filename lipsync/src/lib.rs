//! Viseme-driven lip-sync and body-animation runtime for talking 3D avatars.
//!
//! This crate is renderer-agnostic. It consumes time-stamped viseme events from a speech
//! provider and turns them into morph-target weights and clip blend weights once per frame;
//! mesh loading and drawing live in the host application.

#![forbid(unsafe_code)]

mod config;
mod error;
mod ids;
mod morph;
mod qa;
mod runtime;
mod viseme;

#[cfg(feature = "json")]
pub mod json;

pub use config::*;
pub use error::*;
pub use morph::*;
pub use qa::*;
pub use runtime::*;
pub use viseme::*;



#[cfg(test)]
mod viseme_tests;
