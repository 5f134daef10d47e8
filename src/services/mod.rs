pub mod error_classifier;
pub mod prompt;
pub mod provider_config_store;
pub mod providers;

pub use error_classifier::{classify_http, classify_transport};
pub use provider_config_store::ProviderConfigStore;
pub use providers::{adapter_for, AdapterOutput, CallError, ProviderAdapter};
