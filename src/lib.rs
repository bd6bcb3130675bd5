//! relief-rest: a registry-driven REST backend for humanitarian deployments.
//!
//! Deployments compose settings templates, register resources with their
//! schemas and relationships, freeze both registries, and serve. Every
//! `/{controller}/{function}` path is routed into the shared CRUD kernel.

pub mod auth;
pub mod db;
pub mod deploy;
pub mod error;
pub mod http;
pub mod kernel;
pub mod locale;
pub mod registry;
pub mod render;
pub mod router;
pub mod settings;
pub mod sql;
pub mod state;

pub use auth::{Action, Actor, PermitAll, Policy};
pub use db::{create_name_indexes, create_tables, scheduler_healthy};
pub use error::{ApiError, FieldErrors, RegistryError, SettingsError};
pub use http::{common_routes_with_ready, rest_routes};
pub use kernel::{dispatch, KernelResponse};
pub use locale::MessageCatalog;
pub use registry::{
    CascadePolicy, ComponentLink, ComponentOptions, CrudStrings, Field, FieldRule, FieldType,
    FilterOp, FilterWidget, Resource, ResourceOptions, ResourceRegistry,
};
pub use render::{BasicRenderer, RenderedDoc, ViewRenderer};
pub use router::{route, RecordKey, Representation, ResourceRequest, Routed};
pub use settings::{ModuleDescriptor, SettingsRegistry};
pub use state::AppState;
