// Cross-cutting pieces shared by every layer.

pub mod config;
pub mod error;
pub mod logging;
