//! Library side of the `icustate` command: logging, options and the staged
//! pipeline run.

pub mod logging;
pub mod pipeline;
pub mod settings;
pub mod types;
