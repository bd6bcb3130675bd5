//! The resource request value: immutable after construction, consumed by the kernel.

use serde_json::Value;
use std::fmt;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    pub fn from_method(method: &axum::http::Method) -> Option<Self> {
        match *method {
            axum::http::Method::GET => Some(HttpVerb::Get),
            axum::http::Method::POST => Some(HttpVerb::Post),
            axum::http::Method::PUT => Some(HttpVerb::Put),
            axum::http::Method::DELETE => Some(HttpVerb::Delete),
            _ => None,
        }
    }
}

/// Record keys are serial integers or UUIDs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordKey {
    Serial(i64),
    Uuid(Uuid),
}

impl RecordKey {
    pub fn parse(s: &str) -> Option<Self> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return s.parse().ok().map(RecordKey::Serial);
        }
        Uuid::parse_str(s).ok().map(RecordKey::Uuid)
    }

    pub fn to_value(&self) -> Value {
        match self {
            RecordKey::Serial(n) => Value::Number((*n).into()),
            RecordKey::Uuid(u) => Value::String(u.to_string()),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Serial(n) => write!(f, "{}", n),
            RecordKey::Uuid(u) => write!(f, "{}", u),
        }
    }
}

/// Method tokens recognised in the path. Unrecognised tokens pass through as
/// `Custom`; the kernel decides whether a registered handler takes them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MethodToken {
    Create,
    Update,
    Delete,
    Search,
    Summary,
    Import,
    Export,
    Map,
    Report,
    Purge,
    Custom(String),
}

impl MethodToken {
    pub fn parse(s: &str) -> Self {
        match s {
            "create" => MethodToken::Create,
            "update" => MethodToken::Update,
            "delete" => MethodToken::Delete,
            "search" => MethodToken::Search,
            "summary" => MethodToken::Summary,
            "import" => MethodToken::Import,
            "export" => MethodToken::Export,
            "map" => MethodToken::Map,
            "report" => MethodToken::Report,
            "purge" => MethodToken::Purge,
            other => MethodToken::Custom(other.to_string()),
        }
    }

    pub fn is_recognised(s: &str) -> bool {
        !matches!(MethodToken::parse(s), MethodToken::Custom(_))
    }
}

/// Wire format of the response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Representation {
    Html,
    Json,
    Xml,
    Csv,
    Pdf,
    Xls,
    GeoJson,
    Kml,
    /// Passed through routing; rejected by the kernel.
    Other(String),
}

impl Representation {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "html" => Representation::Html,
            "json" => Representation::Json,
            "xml" => Representation::Xml,
            "csv" => Representation::Csv,
            "pdf" => Representation::Pdf,
            "xls" => Representation::Xls,
            "geojson" => Representation::GeoJson,
            "kml" => Representation::Kml,
            other => Representation::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Representation::Html => "html",
            Representation::Json => "json",
            Representation::Xml => "xml",
            Representation::Csv => "csv",
            Representation::Pdf => "pdf",
            Representation::Xls => "xls",
            Representation::GeoJson => "geojson",
            Representation::Kml => "kml",
            Representation::Other(s) => s,
        }
    }
}

/// A resolved resource request, built by the router and consumed by the kernel.
#[derive(Clone, Debug)]
pub struct ResourceRequest {
    pub verb: HttpVerb,
    pub prefix: String,
    pub name: String,
    pub record: Option<RecordKey>,
    pub component: Option<String>,
    pub component_key: Option<RecordKey>,
    pub method: Option<MethodToken>,
    pub representation: Representation,
    pub vars: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ResourceRequest {
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}
