pub mod config;
pub mod engine;
pub mod executor;
pub mod expression;
pub mod planner;
pub mod source;
pub mod sql;
pub mod table;
pub mod value;

pub use config::EngineConfig;
pub use engine::QueryEngine;
pub use source::{JsonFileSource, MemorySource, TableSource};
pub use table::Table;
pub use value::Value;
