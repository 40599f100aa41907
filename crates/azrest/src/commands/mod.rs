//! CLI command implementations

pub mod ai;
pub mod auth;
pub mod common;
pub mod completion;
pub mod group;
pub mod init;
pub mod operation;
pub mod reservation;
pub mod secret;
pub mod vm;
pub mod vnet;
