//! CLI module for git-smartmsg
//!
//! This module provides:
//! - Command implementations (plan, apply)
//! - Output handlers (console, JSON, quiet)

pub mod commands;
pub mod output;

pub use commands::{ApplyArgs, PlanArgs, apply_command, plan_command};
pub use output::{OutputEvent, OutputHandler, OutputMode, create_handler};
