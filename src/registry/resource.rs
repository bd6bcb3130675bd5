//! Resource descriptors: CRUD strings, component links, per-resource hooks.

use crate::error::ApiError;
use crate::registry::{Field, FieldType};
use crate::router::ResourceRequest;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

/// Localisable message bundle used for UI affordances and status notifications.
#[derive(Clone, Debug, Default)]
pub struct CrudStrings {
    pub create_button: Option<String>,
    pub title_display: Option<String>,
    pub title_list: Option<String>,
    pub title_update: Option<String>,
    pub title_upload: Option<String>,
    pub label_list_button: Option<String>,
    pub label_delete_button: Option<String>,
    pub msg_record_created: Option<String>,
    pub msg_record_modified: Option<String>,
    pub msg_record_deleted: Option<String>,
    pub msg_list_empty: Option<String>,
    pub subtitle_list: Option<String>,
}

impl CrudStrings {
    /// Merge another bundle onto this one; missing keys keep prior values.
    pub fn merge(&mut self, other: CrudStrings) {
        macro_rules! take {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field;
                }
            };
        }
        take!(create_button);
        take!(title_display);
        take!(title_list);
        take!(title_update);
        take!(title_upload);
        take!(label_list_button);
        take!(label_delete_button);
        take!(msg_record_created);
        take!(msg_record_modified);
        take!(msg_record_deleted);
        take!(msg_list_empty);
        take!(subtitle_list);
    }

    pub fn record_created(&self) -> &str {
        self.msg_record_created.as_deref().unwrap_or("Record added")
    }

    pub fn record_modified(&self) -> &str {
        self.msg_record_modified.as_deref().unwrap_or("Record updated")
    }

    pub fn record_deleted(&self) -> &str {
        self.msg_record_deleted.as_deref().unwrap_or("Record deleted")
    }

    pub fn list_empty(&self) -> &str {
        self.msg_list_empty.as_deref().unwrap_or("No records found")
    }
}

/// How a parent delete propagates to component rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CascadePolicy {
    /// Soft-delete component rows along with the parent.
    Cascade,
    /// Null out the join field, keeping the rows.
    Nullify,
}

/// Directed edge from a parent resource to a child resource.
#[derive(Clone, Debug)]
pub struct ComponentLink {
    pub child_prefix: String,
    pub child_name: String,
    /// Field on the child referencing the parent's primary key.
    pub join_field: String,
    pub multiple: bool,
    pub cascade: CascadePolicy,
}

#[derive(Clone, Copy, Debug)]
pub struct ComponentOptions {
    pub multiple: bool,
    pub cascade: CascadePolicy,
}

impl Default for ComponentOptions {
    fn default() -> Self {
        ComponentOptions {
            multiple: true,
            cascade: CascadePolicy::Cascade,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Contains,
    Ge,
    Le,
}

/// Maps a query var to a filter predicate over one field.
#[derive(Clone, Debug)]
pub struct FilterWidget {
    /// Query var name.
    pub name: String,
    pub field: String,
    pub op: FilterOp,
}

impl FilterWidget {
    pub fn new(name: &str, field: &str, op: FilterOp) -> Self {
        FilterWidget {
            name: name.to_string(),
            field: field.to_string(),
            op,
        }
    }
}

/// Builds the structured resource-header context shown above record views.
pub type RheaderFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Deployment hook run on the incoming record before validation.
pub type CustomiseFn = Arc<dyn Fn(&mut Map<String, Value>) + Send + Sync>;

/// Outcome of a custom per-resource method.
pub enum MethodOutcome {
    /// Structured context for the response serialiser.
    Context(Value),
    Redirect(String),
}

/// A custom method handler registered under a method token.
#[async_trait]
pub trait ResourceMethod: Send + Sync {
    async fn handle(
        &self,
        pool: &PgPool,
        resource: &Resource,
        request: &ResourceRequest,
    ) -> Result<MethodOutcome, ApiError>;
}

#[derive(Default)]
pub struct ResourceOptions {
    pub primary_key: Option<String>,
    pub crud_strings: Option<CrudStrings>,
    pub rheader: Option<RheaderFn>,
    /// Ordered field subset shown on create/update forms.
    pub custom_form: Option<Vec<String>>,
    pub methods: HashMap<String, Arc<dyn ResourceMethod>>,
    pub filter_widgets: Vec<FilterWidget>,
    pub customise: Option<CustomiseFn>,
    pub replace: bool,
}

impl ResourceOptions {
    pub fn with_crud_strings(mut self, strings: CrudStrings) -> Self {
        self.crud_strings = Some(strings);
        self
    }

    pub fn with_method(mut self, token: &str, handler: Arc<dyn ResourceMethod>) -> Self {
        self.methods.insert(token.to_string(), handler);
        self
    }

    pub fn with_filter_widget(mut self, widget: FilterWidget) -> Self {
        self.filter_widgets.push(widget);
        self
    }

    pub fn with_customise<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Map<String, Value>) + Send + Sync + 'static,
    {
        self.customise = Some(Arc::new(f));
        self
    }
}

/// A registered resource: schema plus customisations.
#[derive(Clone)]
pub struct Resource {
    pub prefix: String,
    pub name: String,
    pub fields: Vec<Field>,
    pub primary_key: String,
    pub crud_strings: CrudStrings,
    /// Links where this resource is the parent, in registration order.
    pub components: Vec<ComponentLink>,
    pub rheader: Option<RheaderFn>,
    pub custom_form: Option<Vec<String>>,
    pub methods: HashMap<String, Arc<dyn ResourceMethod>>,
    pub filter_widgets: Vec<FilterWidget>,
    pub customise: Option<CustomiseFn>,
}

impl Resource {
    pub fn tablename(&self) -> String {
        format!("{}_{}", self.prefix, self.name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Component link by child resource name.
    pub fn component(&self, name: &str) -> Option<&ComponentLink> {
        self.components.iter().find(|c| c.child_name == name)
    }

    /// Whether the named field is a reference to the given resource.
    pub fn field_references(&self, field: &str, prefix: &str, name: &str) -> bool {
        match self.field(field).map(|f| &f.ftype) {
            Some(FieldType::Reference { prefix: p, name: n }) => p == prefix && n == name,
            _ => false,
        }
    }
}
