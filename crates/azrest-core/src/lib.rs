//! Core types and configuration for azrest

pub mod cloud;
pub mod config;
pub mod resource_id;
