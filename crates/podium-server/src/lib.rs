//! HTTP/JSON surface for Podium. Handlers stay thin over
//! [`podium_core::JudgingService`]; read-path store failures never reach
//! the client as errors, they degrade to empty bodies inside the core.

pub mod error;
pub mod routes;
