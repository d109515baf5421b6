//! CLI commands

pub mod dependency;
pub mod lint;
pub mod login;
pub mod package;
pub mod push;
pub mod template;
