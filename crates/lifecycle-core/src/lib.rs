pub mod config;
pub mod contributors;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod message;
pub mod model;
pub mod node;
pub mod ordering;
pub mod pipeline;
pub mod preferences;
pub mod registry;
pub mod rendering;
pub mod router;
pub mod sources;
pub mod types;

pub use engine::LifecycleEngine;
pub use error::{LifecycleError, Result};
