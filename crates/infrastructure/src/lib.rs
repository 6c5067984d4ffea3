pub mod dry_run_pipeline;
pub mod idea_generator;
pub mod in_memory_store;
pub mod observability;

pub use dry_run_pipeline::DryRunPipeline;
pub use idea_generator::ThemeIdeaGenerator;
pub use in_memory_store::InMemoryTaskStore;
pub use observability::*;
