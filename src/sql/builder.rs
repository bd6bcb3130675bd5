//! Builds parameterized SELECT, INSERT, UPDATE, soft-DELETE, and purge
//! statements from a resource descriptor.
//!
//! Every table carries the meta-columns required for soft-delete and audit.
//! Default queries exclude rows with `deleted = TRUE`; only explicit purge
//! paths see them.

use crate::registry::{FieldType, FilterOp, Resource};
use crate::router::RecordKey;
use serde_json::{Map, Value};

/// Meta-columns present on every resource table.
pub const META_COLUMNS: &[&str] = &[
    "uuid",
    "created_on",
    "modified_on",
    "created_by",
    "modified_by",
    "deleted",
    "owned_by_user",
    "owned_by_group",
    "realm_entity",
];

/// One filter predicate over a declared field.
#[derive(Clone, Debug)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &str, value: Value) -> Self {
        Filter {
            field: field.to_string(),
            op: FilterOp::Eq,
            value,
        }
    }
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Quote identifier for PostgreSQL (safe: only from registered schemas).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// SELECT list: declared fields plus meta-columns. Decimal fields are cast to
/// text so declared scale survives the round-trip.
fn select_column_list(resource: &Resource) -> String {
    let mut cols: Vec<String> = resource
        .fields
        .iter()
        .map(|f| {
            let q = quoted(&f.name);
            if matches!(f.ftype, FieldType::Decimal { .. }) {
                format!("{}::text AS {}", q, q)
            } else {
                q
            }
        })
        .collect();
    cols.extend(META_COLUMNS.iter().map(|c| quoted(c)));
    cols.join(", ")
}

fn key_column(resource: &Resource, key: &RecordKey) -> String {
    match key {
        RecordKey::Serial(_) => quoted(&resource.primary_key),
        RecordKey::Uuid(_) => quoted("uuid"),
    }
}

/// Placeholder for a key param; uuid keys bind as text and need the cast.
fn key_placeholder(key: &RecordKey, param_num: usize) -> String {
    match key {
        RecordKey::Serial(_) => format!("${}", param_num),
        RecordKey::Uuid(_) => format!("${}::uuid", param_num),
    }
}

fn placeholder(resource: &Resource, field: &str, param_num: usize) -> String {
    resource
        .field(field)
        .and_then(|f| f.ftype.bind_cast())
        .map(|t| format!("${}::{}", param_num, t))
        .unwrap_or_else(|| format!("${}", param_num))
}

fn push_filters(q: &mut QueryBuf, resource: &Resource, filters: &[Filter]) -> Vec<String> {
    let mut parts = Vec::new();
    for f in filters {
        if resource.field(&f.field).is_none() {
            continue;
        }
        match f.op {
            FilterOp::Eq => {
                let n = q.push_param(f.value.clone());
                parts.push(format!("{} = {}", quoted(&f.field), placeholder(resource, &f.field, n)));
            }
            FilterOp::Contains => {
                let pattern = format!("%{}%", f.value.as_str().unwrap_or_default());
                let n = q.push_param(Value::String(pattern));
                parts.push(format!("{}::text ILIKE ${}", quoted(&f.field), n));
            }
            FilterOp::Ge => {
                let n = q.push_param(f.value.clone());
                parts.push(format!("{} >= {}", quoted(&f.field), placeholder(resource, &f.field, n)));
            }
            FilterOp::Le => {
                let n = q.push_param(f.value.clone());
                parts.push(format!("{} <= {}", quoted(&f.field), placeholder(resource, &f.field, n)));
            }
        }
    }
    parts
}

/// SELECT list with filters, ORDER BY pk, LIMIT/OFFSET. Soft-deleted rows excluded.
pub fn select_list(
    resource: &Resource,
    filters: &[Filter],
    limit: Option<u32>,
    offset: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = vec![format!("{} = FALSE", quoted("deleted"))];
    where_parts.extend(push_filters(&mut q, resource, filters));
    let limit_clause = limit
        .map(|n| format!(" LIMIT {}", n.min(1000)))
        .unwrap_or_default();
    let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} ORDER BY {}{}{}",
        select_column_list(resource),
        quoted(&resource.tablename()),
        where_parts.join(" AND "),
        quoted(&resource.primary_key),
        limit_clause,
        offset_clause
    );
    q
}

/// SELECT COUNT(*) with filters, excluding soft-deleted rows.
pub fn count(resource: &Resource, filters: &[Filter]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = vec![format!("{} = FALSE", quoted("deleted"))];
    where_parts.extend(push_filters(&mut q, resource, filters));
    q.sql = format!(
        "SELECT COUNT(*) AS {} FROM {} WHERE {}",
        quoted("count"),
        quoted(&resource.tablename()),
        where_parts.join(" AND ")
    );
    q
}

/// Grouped counts over one field (report operation). Soft-deleted rows excluded.
pub fn select_group_counts(resource: &Resource, field: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {col}::text AS {val}, COUNT(*) AS {cnt} FROM {table} WHERE {deleted} = FALSE GROUP BY {col} ORDER BY {col}",
        col = quoted(field),
        val = quoted("value"),
        cnt = quoted("count"),
        table = quoted(&resource.tablename()),
        deleted = quoted("deleted"),
    );
    q
}

/// SELECT one record by primary key or uuid. Soft-deleted rows are invisible.
pub fn select_one(resource: &Resource, key: &RecordKey) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(key.to_value());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {} AND {} = FALSE",
        select_column_list(resource),
        quoted(&resource.tablename()),
        key_column(resource, key),
        key_placeholder(key, 1),
        quoted("deleted")
    );
    q
}

/// SELECT one record regardless of the deleted flag (delete idempotence, purge).
pub fn select_one_any(resource: &Resource, key: &RecordKey) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(key.to_value());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(resource),
        quoted(&resource.tablename()),
        key_column(resource, key),
        key_placeholder(key, 1)
    );
    q
}

/// INSERT from a validated body. Meta-columns are written by the statement:
/// a fresh uuid, NOW() timestamps, `deleted` FALSE, actor ids when known.
pub fn insert(
    resource: &Resource,
    body: &Map<String, Value>,
    actor_id: Option<i64>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut values = Vec::new();
    for f in &resource.fields {
        if f.name == resource.primary_key && !body.contains_key(&f.name) {
            continue;
        }
        let val = match body.get(&f.name) {
            Some(v) => v.clone(),
            None => match &f.default {
                Some(d) => d.clone(),
                None => continue,
            },
        };
        let n = q.push_param(val);
        cols.push(quoted(&f.name));
        values.push(placeholder(resource, &f.name, n));
    }
    let n = q.push_param(Value::String(uuid::Uuid::new_v4().to_string()));
    cols.push(quoted("uuid"));
    values.push(format!("${}::uuid", n));
    cols.push(quoted("created_on"));
    values.push("NOW()".into());
    cols.push(quoted("modified_on"));
    values.push("NOW()".into());
    cols.push(quoted("deleted"));
    values.push("FALSE".into());
    if let Some(actor) = actor_id {
        for col in ["created_by", "modified_by", "owned_by_user"] {
            let n = q.push_param(Value::Number(actor.into()));
            cols.push(quoted(col));
            values.push(format!("${}", n));
        }
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(&resource.tablename()),
        cols.join(", "),
        values.join(", "),
        select_column_list(resource)
    );
    q
}

/// UPDATE by key: SET only declared fields present in the body; bumps
/// modified_on. Soft-deleted rows are not updatable.
pub fn update(
    resource: &Resource,
    key: &RecordKey,
    body: &Map<String, Value>,
    actor_id: Option<i64>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for f in &resource.fields {
        if f.name == resource.primary_key {
            continue;
        }
        if let Some(v) = body.get(&f.name) {
            let n = q.push_param(v.clone());
            sets.push(format!("{} = {}", quoted(&f.name), placeholder(resource, &f.name, n)));
        }
    }
    sets.push(format!("{} = NOW()", quoted("modified_on")));
    if let Some(actor) = actor_id {
        let n = q.push_param(Value::Number(actor.into()));
        sets.push(format!("{} = ${}", quoted("modified_by"), n));
    }
    let key_param = q.push_param(key.to_value());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} AND {} = FALSE RETURNING {}",
        quoted(&resource.tablename()),
        sets.join(", "),
        key_column(resource, key),
        key_placeholder(key, key_param),
        quoted("deleted"),
        select_column_list(resource)
    );
    q
}

/// Soft delete: set the deleted flag. Rows already deleted are untouched,
/// which keeps delete idempotent.
pub fn soft_delete(resource: &Resource, key: &RecordKey, actor_id: Option<i64>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = vec![
        format!("{} = TRUE", quoted("deleted")),
        format!("{} = NOW()", quoted("modified_on")),
    ];
    if let Some(actor) = actor_id {
        let n = q.push_param(Value::Number(actor.into()));
        sets.push(format!("{} = ${}", quoted("modified_by"), n));
    }
    let key_param = q.push_param(key.to_value());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} AND {} = FALSE RETURNING {}",
        quoted(&resource.tablename()),
        sets.join(", "),
        key_column(resource, key),
        key_placeholder(key, key_param),
        quoted("deleted"),
        quoted(&resource.primary_key)
    );
    q
}

/// Soft-delete component rows joined to a parent record (Cascade policy).
pub fn soft_delete_components(child: &Resource, join_field: &str, parent_key: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(parent_key.clone());
    q.sql = format!(
        "UPDATE {} SET {} = TRUE, {} = NOW() WHERE {} = $1 AND {} = FALSE",
        quoted(&child.tablename()),
        quoted("deleted"),
        quoted("modified_on"),
        quoted(join_field),
        quoted("deleted")
    );
    q
}

/// Null out the join field on component rows (Nullify policy).
pub fn nullify_component(child: &Resource, join_field: &str, parent_key: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(parent_key.clone());
    q.sql = format!(
        "UPDATE {} SET {} = NULL, {} = NOW() WHERE {} = $1 AND {} = FALSE",
        quoted(&child.tablename()),
        quoted(join_field),
        quoted("modified_on"),
        quoted(join_field),
        quoted("deleted")
    );
    q
}

/// Hard delete for privileged purge. Sees soft-deleted rows.
pub fn purge(resource: &Resource, key: &RecordKey) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(key.to_value());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        quoted(&resource.tablename()),
        key_column(resource, key),
        key_placeholder(key, 1),
        quoted(&resource.primary_key)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Field, FieldType, Resource};
    use serde_json::json;

    fn course() -> Resource {
        Resource {
            prefix: "hrm".into(),
            name: "course".into(),
            fields: vec![
                Field::new("id", FieldType::Integer).not_null(),
                Field::new("name", FieldType::Str).not_null(),
                Field::new("fee", FieldType::Decimal { precision: 10, scale: 2 }),
                Field::new("start_date", FieldType::Date),
            ],
            primary_key: "id".into(),
            crud_strings: Default::default(),
            components: Vec::new(),
            rheader: None,
            custom_form: None,
            methods: Default::default(),
            filter_widgets: Vec::new(),
            customise: None,
        }
    }

    #[test]
    fn list_excludes_soft_deleted_rows() {
        let q = select_list(&course(), &[], Some(10), None);
        assert!(q.sql.contains("\"deleted\" = FALSE"));
        assert!(q.sql.contains("FROM \"hrm_course\""));
        assert!(q.sql.contains("LIMIT 10"));
    }

    #[test]
    fn filters_skip_undeclared_fields() {
        let filters = vec![
            Filter::eq("name", json!("First Aid")),
            Filter::eq("nonsense", json!(1)),
        ];
        let q = select_list(&course(), &filters, None, None);
        assert!(q.sql.contains("\"name\" = $1"));
        assert!(!q.sql.contains("nonsense"));
        assert_eq!(q.params.len(), 1);
    }

    #[test]
    fn contains_filter_uses_ilike() {
        let filters = vec![Filter {
            field: "name".into(),
            op: FilterOp::Contains,
            value: json!("aid"),
        }];
        let q = select_list(&course(), &filters, None, None);
        assert!(q.sql.contains("ILIKE"));
        assert_eq!(q.params[0], json!("%aid%"));
    }

    #[test]
    fn select_one_by_uuid_targets_uuid_column() {
        let key = RecordKey::Uuid(uuid::Uuid::nil());
        let q = select_one(&course(), &key);
        assert!(q.sql.contains("WHERE \"uuid\" = $1"));
        assert!(q.sql.contains("\"deleted\" = FALSE"));
    }

    #[test]
    fn insert_writes_meta_columns() {
        let body = serde_json::from_value(json!({"name": "Emergency First Aid"})).unwrap();
        let q = insert(&course(), &body, Some(7));
        assert!(q.sql.contains("\"uuid\""));
        assert!(q.sql.contains("\"created_on\""));
        assert!(q.sql.contains("\"deleted\""));
        assert!(q.sql.contains("\"created_by\""));
        assert!(q.sql.contains("RETURNING"));
        // name + uuid + 3 actor columns
        assert_eq!(q.params.len(), 5);
    }

    #[test]
    fn insert_casts_date_and_decimal() {
        let body =
            serde_json::from_value(json!({"name": "x", "fee": "25.00", "start_date": "2026-03-01"}))
                .unwrap();
        let q = insert(&course(), &body, None);
        assert!(q.sql.contains("::numeric"));
        assert!(q.sql.contains("::date"));
    }

    #[test]
    fn update_only_touches_live_rows() {
        let body = serde_json::from_value(json!({"name": "Renamed"})).unwrap();
        let q = update(&course(), &RecordKey::Serial(42), &body, None);
        assert!(q.sql.contains("\"modified_on\" = NOW()"));
        assert!(q.sql.contains("AND \"deleted\" = FALSE"));
        assert!(!q.sql.contains("\"id\" = $1,"));
    }

    #[test]
    fn soft_delete_is_flag_update_not_delete() {
        let q = soft_delete(&course(), &RecordKey::Serial(42), None);
        assert!(q.sql.starts_with("UPDATE"));
        assert!(q.sql.contains("\"deleted\" = TRUE"));
        assert!(q.sql.contains("AND \"deleted\" = FALSE"));
    }

    #[test]
    fn purge_sees_deleted_rows() {
        let q = purge(&course(), &RecordKey::Serial(42));
        assert!(q.sql.starts_with("DELETE FROM"));
        assert!(!q.sql.contains("deleted"));
    }
}
