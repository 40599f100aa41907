//! Azure REST clients, credentials, and long-running operation support for azrest

pub mod arm;
pub mod auth;
pub mod error;
pub mod identity;
pub mod keyvault;
pub mod multipart;
pub mod openai;
pub mod pager;
pub mod pipeline;
pub mod poller;
pub mod request;
pub mod sse;
