//! Executes a resolved resource request: authorize, load, validate, commit,
//! and build the structured response context.

use crate::auth::{Action, Actor};
use crate::error::ApiError;
use crate::kernel::exec::DataService;
use crate::kernel::select::{select_operation, Operation};
use crate::kernel::validate::validate_record;
use crate::registry::{CascadePolicy, FieldType, Resource};
use crate::router::{Representation, ResourceRequest};
use crate::sql;
use crate::sql::{Filter, QueryBuf};
use crate::state::AppState;
use serde_json::{json, Map, Value};

/// Representation-agnostic response: the HTTP layer serialises the context.
#[derive(Debug)]
pub struct KernelResponse {
    pub status: u16,
    pub location: Option<String>,
    pub representation: Representation,
    pub context: Value,
    pub message: Option<String>,
}

impl KernelResponse {
    fn ok(representation: &Representation, context: Value) -> Self {
        KernelResponse {
            status: 200,
            location: None,
            representation: representation.clone(),
            context,
            message: None,
        }
    }

    fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}

fn action_for(op: &Operation) -> Action {
    match op {
        Operation::CreateForm | Operation::CreateCommit | Operation::Import => Action::Create,
        Operation::UpdateForm | Operation::UpdateCommit => Action::Update,
        Operation::DeleteCommit => Action::Delete,
        Operation::Purge => Action::Purge,
        _ => Action::Read,
    }
}

pub async fn dispatch(
    state: &AppState,
    req: &ResourceRequest,
    actor: &Actor,
) -> Result<KernelResponse, ApiError> {
    if let Representation::Other(name) = &req.representation {
        return Err(ApiError::UnsupportedRepresentation(name.clone()));
    }
    let resource = state.registry.resolve(&req.prefix, &req.name)?;
    let op = select_operation(req)?;

    let action = action_for(&op);
    if !state
        .policy
        .permits(action, (&req.prefix, &req.name), req.record.as_ref(), actor)
    {
        tracing::warn!(
            resource = %resource.tablename(),
            ?action,
            actor = ?actor.id,
            "authorization denied"
        );
        return Err(ApiError::Forbidden(format!(
            "{:?} on {}",
            action,
            resource.tablename()
        )));
    }

    let lang = req
        .var("language")
        .map(str::to_string)
        .or_else(|| state.settings.get_str("L10n.default_language"))
        .unwrap_or_else(|| "en".to_string());
    let say = |msg: &str| state.catalog.translate(&lang, msg).to_string();

    match op {
        Operation::List { component: false } => list(state, req, resource).await,
        Operation::List { component: true } => component_list(state, req, resource).await,
        Operation::Read { component: false } => read(state, req, resource).await,
        Operation::Read { component: true } => component_read(state, req, resource).await,
        Operation::CreateForm => create_form(req, resource),
        Operation::UpdateForm => update_form(state, req, resource).await,
        Operation::CreateCommit => create_commit(state, req, resource, actor, &say).await,
        Operation::UpdateCommit => update_commit(state, req, resource, actor, &say).await,
        Operation::DeleteCommit => delete_commit(state, req, resource, actor, &say).await,
        Operation::Search => search(state, req, resource).await,
        Operation::Summary => summary(state, req, resource).await,
        Operation::Import => import(state, req, resource, actor, &say).await,
        Operation::Export => export(state, req, resource).await,
        Operation::Map => map_context(state, req, resource).await,
        Operation::Report => report(state, req, resource).await,
        Operation::Purge => purge(state, req, resource, &say).await,
        Operation::Custom(name) => custom(state, req, resource, &name).await,
    }
}

fn field_names(resource: &Resource) -> Vec<String> {
    resource.fields.iter().map(|f| f.name.clone()).collect()
}

/// Primary-key value of a returned row as a path segment. Serial keys are
/// numbers, uuid and text keys are strings.
fn record_id_string(row: &Value, primary_key: &str) -> String {
    match row.get(primary_key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn ftype_name(ftype: &FieldType) -> &'static str {
    match ftype {
        FieldType::Integer => "integer",
        FieldType::Double => "double",
        FieldType::Decimal { .. } => "decimal",
        FieldType::Boolean => "boolean",
        FieldType::Str => "string",
        FieldType::Text => "text",
        FieldType::Date => "date",
        FieldType::DateTime => "datetime",
        FieldType::Timestamp => "timestamp",
        FieldType::Reference { .. } => "reference",
        FieldType::Choice(_) => "options",
        FieldType::Location => "location",
        FieldType::Upload => "upload",
        FieldType::Json => "json",
    }
}

/// Form field metadata honoring the custom form's field order when declared.
fn form_fields(resource: &Resource) -> Value {
    let ordered: Vec<&crate::registry::Field> = match &resource.custom_form {
        Some(names) => names
            .iter()
            .filter_map(|n| resource.field(n))
            .collect(),
        None => resource
            .fields
            .iter()
            .filter(|f| f.name != resource.primary_key)
            .collect(),
    };
    Value::Array(
        ordered
            .iter()
            .map(|f| {
                let mut entry = json!({
                    "name": f.name,
                    "label": f.label.clone().unwrap_or_else(|| f.name.clone()),
                    "type": ftype_name(&f.ftype),
                    "required": !f.nullable && f.default.is_none(),
                });
                if let FieldType::Choice(options) = &f.ftype {
                    entry["options"] = json!(options);
                }
                entry
            })
            .collect(),
    )
}

fn coerce_query_value(resource: &Resource, field: &str, raw: &str) -> Value {
    match resource.field(field).map(|f| &f.ftype) {
        Some(FieldType::Integer) | Some(FieldType::Reference { .. }) | Some(FieldType::Location) => {
            raw.parse::<i64>().map(Value::from).unwrap_or_else(|_| json!(raw))
        }
        Some(FieldType::Double) | Some(FieldType::Decimal { .. }) => {
            raw.parse::<f64>().map(Value::from).unwrap_or_else(|_| json!(raw))
        }
        Some(FieldType::Boolean) => match raw {
            "1" | "true" | "True" => json!(true),
            "0" | "false" | "False" => json!(false),
            _ => json!(raw),
        },
        _ => json!(raw),
    }
}

/// Filters from query vars: filter widgets claim their vars first, any other
/// var matching a declared field becomes an equality filter.
fn build_filters(resource: &Resource, req: &ResourceRequest) -> (Vec<Filter>, Option<u32>, Option<u32>) {
    let mut filters = Vec::new();
    let mut limit = None;
    let mut offset = None;
    for (k, v) in &req.vars {
        match k.as_str() {
            "limit" => limit = v.parse().ok(),
            "offset" => offset = v.parse().ok(),
            "format" | "language" => {}
            _ => {
                if let Some(widget) = resource.filter_widgets.iter().find(|w| &w.name == k) {
                    filters.push(Filter {
                        field: widget.field.clone(),
                        op: widget.op,
                        value: coerce_query_value(resource, &widget.field, v),
                    });
                } else if resource.field(k).is_some() {
                    filters.push(Filter::eq(k, coerce_query_value(resource, k, v)));
                }
            }
        }
    }
    (filters, limit, offset)
}

fn body_to_map(body: &Option<Value>) -> Result<Map<String, Value>, ApiError> {
    match body {
        Some(Value::Object(m)) => Ok(m.clone()),
        _ => Err(ApiError::BadRequest("body must be a JSON object".into())),
    }
}

fn rheader_context(resource: &Resource, record: &Value) -> Option<Value> {
    resource.rheader.as_ref().map(|builder| builder(record))
}

/// Load the parent record and resolve a component link, returning the child
/// resource and the equality filter joining it to the parent.
async fn resolve_component<'a>(
    state: &'a AppState,
    req: &ResourceRequest,
    parent: &Resource,
) -> Result<(Value, &'a Resource, Filter), ApiError> {
    let record_key = req
        .record
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("component access requires a record".into()))?;
    let parent_row = DataService::fetch_optional(&state.pool, &sql::select_one(parent, record_key))
        .await?
        .ok_or_else(|| ApiError::NotFound(record_key.to_string()))?;
    let component_name = req
        .component
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("component access requires a component".into()))?;
    let link = parent
        .component(component_name)
        .ok_or_else(|| ApiError::NotFound(component_name.to_string()))?;
    let child = state.registry.resolve(&link.child_prefix, &link.child_name)?;
    let parent_id = parent_row
        .get(&parent.primary_key)
        .cloned()
        .unwrap_or(Value::Null);
    Ok((parent_row, child, Filter::eq(&link.join_field, parent_id)))
}

async fn list(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
) -> Result<KernelResponse, ApiError> {
    let (filters, limit, offset) = build_filters(resource, req);
    let rows = DataService::fetch_all(&state.pool, &sql::select_list(resource, &filters, limit, offset)).await?;
    Ok(KernelResponse::ok(&req.representation, list_context(resource, rows)))
}

fn list_context(resource: &Resource, rows: Vec<Value>) -> Value {
    let mut ctx = json!({
        "resource": resource.tablename(),
        "title": resource.crud_strings.title_list.clone().unwrap_or_else(|| resource.tablename()),
        "columns": field_names(resource),
        "count": rows.len(),
        "rows": rows,
    });
    if ctx["count"] == json!(0) {
        ctx["empty"] = json!(resource.crud_strings.list_empty());
    }
    if let Some(subtitle) = &resource.crud_strings.subtitle_list {
        ctx["subtitle"] = json!(subtitle);
    }
    ctx
}

async fn component_list(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
) -> Result<KernelResponse, ApiError> {
    let (parent_row, child, join) = resolve_component(state, req, resource).await?;
    let (mut filters, limit, offset) = build_filters(child, req);
    filters.push(join);
    let rows = DataService::fetch_all(&state.pool, &sql::select_list(child, &filters, limit, offset)).await?;
    let mut ctx = list_context(child, rows);
    if let Some(rheader) = rheader_context(resource, &parent_row) {
        ctx["rheader"] = rheader;
    }
    Ok(KernelResponse::ok(&req.representation, ctx))
}

async fn read(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
) -> Result<KernelResponse, ApiError> {
    let key = req
        .record
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("read requires a record".into()))?;
    let row = DataService::fetch_optional(&state.pool, &sql::select_one(resource, key))
        .await?
        .ok_or_else(|| ApiError::NotFound(key.to_string()))?;
    let mut ctx = json!({
        "resource": resource.tablename(),
        "title": resource.crud_strings.title_display.clone().unwrap_or_else(|| resource.tablename()),
        "record": row,
    });
    if let Some(rheader) = rheader_context(resource, &ctx["record"]) {
        ctx["rheader"] = rheader;
    }
    Ok(KernelResponse::ok(&req.representation, ctx))
}

async fn component_read(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
) -> Result<KernelResponse, ApiError> {
    let (parent_row, child, join) = resolve_component(state, req, resource).await?;
    let component_key = req
        .component_key
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("component read requires a record".into()))?;
    let row = DataService::fetch_optional(&state.pool, &sql::select_one(child, component_key))
        .await?
        .filter(|row| row.get(&join.field) == Some(&join.value))
        .ok_or_else(|| ApiError::NotFound(component_key.to_string()))?;
    let mut ctx = json!({
        "resource": child.tablename(),
        "title": child.crud_strings.title_display.clone().unwrap_or_else(|| child.tablename()),
        "record": row,
    });
    if let Some(rheader) = rheader_context(resource, &parent_row) {
        ctx["rheader"] = rheader;
    }
    Ok(KernelResponse::ok(&req.representation, ctx))
}

fn create_form(req: &ResourceRequest, resource: &Resource) -> Result<KernelResponse, ApiError> {
    let ctx = json!({
        "resource": resource.tablename(),
        "title": resource.crud_strings.create_button.clone().unwrap_or_else(|| "Add Record".into()),
        "fields": form_fields(resource),
    });
    Ok(KernelResponse::ok(&req.representation, ctx))
}

async fn update_form(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
) -> Result<KernelResponse, ApiError> {
    let key = req
        .record
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("update requires a record".into()))?;
    let row = DataService::fetch_optional(&state.pool, &sql::select_one(resource, key))
        .await?
        .ok_or_else(|| ApiError::NotFound(key.to_string()))?;
    let ctx = json!({
        "resource": resource.tablename(),
        "title": resource.crud_strings.title_update.clone().unwrap_or_else(|| "Edit Record".into()),
        "fields": form_fields(resource),
        "record": row,
    });
    Ok(KernelResponse::ok(&req.representation, ctx))
}

/// Run a single-statement mutation in its own transaction, with the kernel's
/// transient-retry policy around the whole commit.
async fn run_mutation(state: &AppState, q: &QueryBuf) -> Result<Option<Value>, ApiError> {
    let pool = &state.pool;
    DataService::with_retries(|| async move {
        let mut tx = pool.begin().await?;
        let row = DataService::execute_tx(&mut tx, q).await?;
        tx.commit().await?;
        Ok(row)
    })
    .await
}

async fn create_commit(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
    actor: &Actor,
    say: &(dyn Fn(&str) -> String + Sync),
) -> Result<KernelResponse, ApiError> {
    let mut body = body_to_map(&req.body)?;

    // Component create: the child row is forced onto the parent key.
    let target: &Resource;
    if req.component.is_some() {
        let (_, child, join) = resolve_component(state, req, resource).await?;
        body.insert(join.field.clone(), join.value.clone());
        target = child;
    } else {
        target = resource;
    }

    if let Some(customise) = &target.customise {
        customise(&mut body);
    }
    validate_record(target, &body, false).map_err(ApiError::Validation)?;

    let q = sql::insert(target, &body, actor.id);
    let row = run_mutation(state, &q)
        .await?
        .ok_or_else(|| ApiError::Fatal(format!("insert into {} returned no row", target.tablename())))?;
    let new_id = record_id_string(&row, &target.primary_key);

    let message = say(target.crud_strings.record_created());
    let mut response = KernelResponse::ok(&req.representation, json!({ "record": row }));
    match req.representation {
        Representation::Html => {
            response.status = 303;
            response.location = Some(match (&req.component, &req.record) {
                (Some(_), Some(record)) => {
                    format!("/{}/{}/{}", req.prefix, req.name, record)
                }
                _ => format!("/{}/{}/{}", req.prefix, req.name, new_id),
            });
        }
        _ => response.status = 201,
    }
    Ok(response.with_message(message))
}

async fn update_commit(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
    actor: &Actor,
    say: &(dyn Fn(&str) -> String + Sync),
) -> Result<KernelResponse, ApiError> {
    // Component updates target the child row; plain updates the primary record.
    let (target, key) = if req.component.is_some() {
        let (_, child, _) = resolve_component(state, req, resource).await?;
        let key = req
            .component_key
            .clone()
            .ok_or_else(|| ApiError::BadRequest("component update requires a record".into()))?;
        (child, key)
    } else {
        let key = req
            .record
            .clone()
            .ok_or_else(|| ApiError::BadRequest("update requires a record".into()))?;
        (resource, key)
    };
    let mut body = body_to_map(&req.body)?;
    if let Some(customise) = &target.customise {
        customise(&mut body);
    }
    validate_record(target, &body, true).map_err(ApiError::Validation)?;

    let q = sql::update(target, &key, &body, actor.id);
    let row = run_mutation(state, &q)
        .await?
        .ok_or_else(|| ApiError::NotFound(key.to_string()))?;

    let message = say(target.crud_strings.record_modified());
    let mut response = KernelResponse::ok(&req.representation, json!({ "record": row }));
    if req.representation == Representation::Html {
        response.status = 303;
        response.location = Some(match &req.record {
            Some(record) => format!("/{}/{}/{}", req.prefix, req.name, record),
            None => format!("/{}/{}/{}", req.prefix, req.name, key),
        });
    }
    Ok(response.with_message(message))
}

async fn delete_commit(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
    actor: &Actor,
    say: &(dyn Fn(&str) -> String + Sync),
) -> Result<KernelResponse, ApiError> {
    // Component deletes target the child row.
    let (target, key) = if req.component.is_some() {
        let (_, child, _) = resolve_component(state, req, resource).await?;
        let key = req
            .component_key
            .clone()
            .ok_or_else(|| ApiError::BadRequest("component delete requires a record".into()))?;
        (child, key)
    } else {
        let key = req
            .record
            .clone()
            .ok_or_else(|| ApiError::BadRequest("delete requires a record".into()))?;
        (resource, key)
    };
    let existing = DataService::fetch_optional(&state.pool, &sql::select_one_any(target, &key))
        .await?
        .ok_or_else(|| ApiError::NotFound(key.to_string()))?;

    // Already soft-deleted: success with no further side effect.
    let already = existing.get("deleted").and_then(|v| v.as_bool()).unwrap_or(false);
    if !already {
        let parent_id = existing
            .get(&target.primary_key)
            .cloned()
            .unwrap_or(Value::Null);
        let delete_q = sql::soft_delete(target, &key, actor.id);
        let mut cascade_qs: Vec<QueryBuf> = Vec::new();
        for link in &target.components {
            let child = state.registry.resolve(&link.child_prefix, &link.child_name)?;
            cascade_qs.push(match link.cascade {
                CascadePolicy::Cascade => {
                    sql::soft_delete_components(child, &link.join_field, &parent_id)
                }
                CascadePolicy::Nullify => {
                    sql::nullify_component(child, &link.join_field, &parent_id)
                }
            });
        }
        let pool = &state.pool;
        let delete_q = &delete_q;
        let cascade_qs = &cascade_qs;
        DataService::with_retries(|| async move {
            let mut tx = pool.begin().await?;
            DataService::execute_tx(&mut tx, delete_q).await?;
            for q in cascade_qs.iter() {
                DataService::execute_tx(&mut tx, q).await?;
            }
            tx.commit().await?;
            Ok(())
        })
        .await?;
    }

    let message = say(target.crud_strings.record_deleted());
    Ok(KernelResponse::ok(&req.representation, json!({ "deleted": true }))
        .with_message(message))
}

async fn search(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
) -> Result<KernelResponse, ApiError> {
    let (filters, limit, offset) = build_filters(resource, req);
    let rows = DataService::fetch_all(&state.pool, &sql::select_list(resource, &filters, limit, offset)).await?;
    let mut ctx = list_context(resource, rows);
    ctx["search"] = json!(true);
    Ok(KernelResponse::ok(&req.representation, ctx))
}

async fn summary(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
) -> Result<KernelResponse, ApiError> {
    let (filters, limit, offset) = build_filters(resource, req);
    let total = DataService::fetch_optional(&state.pool, &sql::count(resource, &filters))
        .await?
        .and_then(|row| row.get("count").and_then(|v| v.as_i64()))
        .unwrap_or(0);
    let rows = DataService::fetch_all(
        &state.pool,
        &sql::select_list(resource, &filters, limit.or(Some(25)), offset),
    )
    .await?;
    let mut ctx = list_context(resource, rows);
    ctx["total"] = json!(total);
    Ok(KernelResponse::ok(&req.representation, ctx))
}

/// Import ingress: a JSON array routed through the same validate+create path.
/// All-or-nothing: one invalid row rejects the batch before any write.
async fn import(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
    actor: &Actor,
    say: &(dyn Fn(&str) -> String + Sync),
) -> Result<KernelResponse, ApiError> {
    let items = match &req.body {
        Some(Value::Array(items)) => items.clone(),
        _ => return Err(ApiError::BadRequest("import body must be a JSON array".into())),
    };
    let mut errors = crate::error::FieldErrors::new();
    let mut prepared = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let mut map = match item {
            Value::Object(m) => m,
            _ => {
                errors
                    .entry(format!("{}", index))
                    .or_default()
                    .push("must be a JSON object".into());
                continue;
            }
        };
        if let Some(customise) = &resource.customise {
            customise(&mut map);
        }
        if let Err(row_errors) = validate_record(resource, &map, false) {
            for (field, messages) in row_errors {
                errors.insert(format!("{}.{}", index, field), messages);
            }
            continue;
        }
        prepared.push(map);
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    let queries: Vec<QueryBuf> = prepared
        .iter()
        .map(|map| sql::insert(resource, map, actor.id))
        .collect();
    let created = queries.len();
    let pool = &state.pool;
    let queries = &queries;
    DataService::with_retries(|| async move {
        let mut tx = pool.begin().await?;
        for q in queries.iter() {
            DataService::execute_tx(&mut tx, q).await?;
        }
        tx.commit().await?;
        Ok(())
    })
    .await?;
    let message = say(resource.crud_strings.record_created());
    Ok(
        KernelResponse::ok(&req.representation, json!({ "created": created }))
            .with_message(message),
    )
}

async fn export(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
) -> Result<KernelResponse, ApiError> {
    let (filters, _, _) = build_filters(resource, req);
    let rows = DataService::fetch_all(&state.pool, &sql::select_list(resource, &filters, None, None)).await?;
    Ok(KernelResponse::ok(&req.representation, list_context(resource, rows)))
}

async fn map_context(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
) -> Result<KernelResponse, ApiError> {
    let location_fields: Vec<String> = resource
        .fields
        .iter()
        .filter(|f| f.ftype == FieldType::Location)
        .map(|f| f.name.clone())
        .collect();
    if location_fields.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "{} has no location fields to map",
            resource.tablename()
        )));
    }
    let (filters, limit, offset) = build_filters(resource, req);
    let rows = DataService::fetch_all(&state.pool, &sql::select_list(resource, &filters, limit, offset)).await?;
    let mut ctx = list_context(resource, rows);
    ctx["location_fields"] = json!(location_fields);
    Ok(KernelResponse::ok(&req.representation, ctx))
}

async fn report(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
) -> Result<KernelResponse, ApiError> {
    let field = match req.var("field") {
        Some(f) => f.to_string(),
        None => resource
            .fields
            .iter()
            .find(|f| matches!(f.ftype, FieldType::Choice(_)))
            .map(|f| f.name.clone())
            .ok_or_else(|| ApiError::BadRequest("report requires a field".into()))?,
    };
    if resource.field(&field).is_none() {
        return Err(ApiError::BadRequest(format!("unknown report field: {}", field)));
    }
    let groups = DataService::fetch_all(&state.pool, &sql::select_group_counts(resource, &field)).await?;
    let ctx = json!({
        "resource": resource.tablename(),
        "field": field,
        "groups": groups,
    });
    Ok(KernelResponse::ok(&req.representation, ctx))
}

/// Hard delete of a record, soft-deleted or not. Reaches here only after the
/// policy permitted `Action::Purge`.
async fn purge(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
    say: &(dyn Fn(&str) -> String + Sync),
) -> Result<KernelResponse, ApiError> {
    let key = req
        .record
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("purge requires a record".into()))?;
    let q = sql::purge(resource, key);
    run_mutation(state, &q)
        .await?
        .ok_or_else(|| ApiError::NotFound(key.to_string()))?;
    let message = say(resource.crud_strings.record_deleted());
    Ok(KernelResponse::ok(&req.representation, json!({ "purged": true }))
        .with_message(message))
}

async fn custom(
    state: &AppState,
    req: &ResourceRequest,
    resource: &Resource,
    name: &str,
) -> Result<KernelResponse, ApiError> {
    let handler = resource
        .methods
        .get(name)
        .ok_or_else(|| ApiError::NotFound(name.to_string()))?;
    match handler.handle(&state.pool, resource, req).await? {
        crate::registry::MethodOutcome::Context(context) => {
            Ok(KernelResponse::ok(&req.representation, context))
        }
        crate::registry::MethodOutcome::Redirect(location) => Ok(KernelResponse {
            status: 303,
            location: Some(location),
            representation: req.representation.clone(),
            context: Value::Null,
            message: None,
        }),
    }
}
