//! Prompt template store adapters.

mod yaml_store;

pub use yaml_store::YamlTemplateStore;
