// Toolkit generation: story content, then illustrations.
// All generation-service calls go through llm_client; no direct HTTP calls here.

pub mod difficulty;
pub mod handlers;
pub mod orchestrator;
pub mod prompts;
pub mod schema;
