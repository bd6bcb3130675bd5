//! Composable deployment settings: templates, modules, name-path lookups.

mod registry;

pub use registry::{ModuleDescriptor, SettingsRegistry, TemplateFn};
