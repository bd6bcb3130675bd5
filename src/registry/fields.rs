//! Field descriptors: semantic types, nullability, validation rules.

use serde_json::Value;
use std::sync::Arc;

/// The recognised semantic field types.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    Integer,
    Double,
    Decimal { precision: u8, scale: u8 },
    Boolean,
    /// Short text (single line).
    Str,
    /// Long text.
    Text,
    Date,
    DateTime,
    Timestamp,
    /// Foreign-key reference to another resource's primary key.
    Reference { prefix: String, name: String },
    /// Enumerated choice with an ordered option list.
    Choice(Vec<String>),
    /// Reference into the location registry (structured sub-entity).
    Location,
    /// Uploaded file key.
    Upload,
    Json,
}

impl FieldType {
    pub fn reference(prefix: &str, name: &str) -> Self {
        FieldType::Reference {
            prefix: prefix.to_string(),
            name: name.to_string(),
        }
    }

    /// PostgreSQL column type for DDL and bind casts.
    pub fn pg_type(&self) -> String {
        match self {
            FieldType::Integer => "bigint".into(),
            FieldType::Double => "double precision".into(),
            FieldType::Decimal { precision, scale } => {
                format!("numeric({},{})", precision, scale)
            }
            FieldType::Boolean => "boolean".into(),
            FieldType::Str | FieldType::Choice(_) => "varchar(512)".into(),
            FieldType::Text | FieldType::Upload => "text".into(),
            FieldType::Date => "date".into(),
            FieldType::DateTime => "timestamp".into(),
            FieldType::Timestamp => "timestamptz".into(),
            FieldType::Reference { .. } | FieldType::Location => "bigint".into(),
            FieldType::Json => "jsonb".into(),
        }
    }

    /// Cast name for bind placeholders where string binds need coercion.
    pub fn bind_cast(&self) -> Option<&'static str> {
        match self {
            FieldType::Date => Some("date"),
            FieldType::DateTime => Some("timestamp"),
            FieldType::Timestamp => Some("timestamptz"),
            FieldType::Decimal { .. } => Some("numeric"),
            FieldType::Json => Some("jsonb"),
            _ => None,
        }
    }
}

pub type FieldPredicate = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Declarative validation rule; applied on create and update.
#[derive(Clone, Default)]
pub struct FieldRule {
    pub required: Option<bool>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub pattern: Option<String>,
    pub allowed: Option<Vec<Value>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub format: Option<String>,
    /// Custom predicate, run last.
    pub predicate: Option<FieldPredicate>,
}

impl FieldRule {
    pub fn required() -> Self {
        FieldRule {
            required: Some(true),
            ..Default::default()
        }
    }

    pub fn length(min: u32, max: u32) -> Self {
        FieldRule {
            min_length: Some(min),
            max_length: Some(max),
            ..Default::default()
        }
    }

    pub fn range(minimum: f64, maximum: f64) -> Self {
        FieldRule {
            minimum: Some(minimum),
            maximum: Some(maximum),
            ..Default::default()
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn with_predicate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(f));
        self
    }
}

#[derive(Clone)]
pub struct Field {
    pub name: String,
    pub ftype: FieldType,
    pub nullable: bool,
    pub default: Option<Value>,
    /// Display label; defaults to the field name at render time.
    pub label: Option<String>,
    pub rule: Option<FieldRule>,
}

impl Field {
    pub fn new(name: &str, ftype: FieldType) -> Self {
        Field {
            name: name.to_string(),
            ftype,
            nullable: true,
            default: None,
            label: None,
            rule: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, v: Value) -> Self {
        self.default = Some(v);
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rule = Some(rule);
        self
    }
}
