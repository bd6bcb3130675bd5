//! Resource declarations: schemas, relationships, customisations.

mod catalog;
mod fields;
mod resource;

pub use catalog::ResourceRegistry;
pub use fields::{Field, FieldRule, FieldType};
pub use resource::{
    CascadePolicy, ComponentLink, ComponentOptions, CrudStrings, CustomiseFn, FilterOp,
    FilterWidget, MethodOutcome, Resource, ResourceMethod, ResourceOptions, RheaderFn,
};
