pub mod config;
pub mod service;

pub use config::{ImplementationGuide, ValidationOptions, ValidatorConfig};
pub use service::{ValidatorService, assemble_engine};
