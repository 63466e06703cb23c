//! Timing Butler core
//!
//! Decides, for one subtitle event at a time, whether its start and end
//! should snap to the nearest video keyframe, chain to the previous line
//! or receive a fixed lead-in/lead-out.
//!
//! This crate contains all business logic with zero UI dependencies.
//! It can be used by an editor plugin or a CLI tool.

pub mod butler;
pub mod config;
pub mod logging;
pub mod timing;
