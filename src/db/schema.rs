//! DDL from the resource registry: one table per resource, meta-columns on
//! every table, foreign keys for reference fields whose target is registered.

use crate::error::ApiError;
use crate::registry::{FieldType, Resource, ResourceRegistry};
use sqlx::PgPool;

fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn column_defs(resource: &Resource) -> Vec<String> {
    let mut defs = Vec::new();
    for f in &resource.fields {
        if f.name == resource.primary_key {
            // Integer keys are serial; anything else keeps the declared type.
            let pk_type = match f.ftype {
                FieldType::Integer => "BIGSERIAL".to_string(),
                _ => f.ftype.pg_type(),
            };
            defs.push(format!("{} {} PRIMARY KEY", quoted(&f.name), pk_type));
            continue;
        }
        let mut def = format!("{} {}", quoted(&f.name), f.ftype.pg_type());
        if !f.nullable {
            def.push_str(" NOT NULL");
        }
        defs.push(def);
    }
    defs.push(format!(
        "{} UUID NOT NULL DEFAULT gen_random_uuid()",
        quoted("uuid")
    ));
    defs.push(format!(
        "{} TIMESTAMPTZ NOT NULL DEFAULT NOW()",
        quoted("created_on")
    ));
    defs.push(format!(
        "{} TIMESTAMPTZ NOT NULL DEFAULT NOW()",
        quoted("modified_on")
    ));
    for col in ["created_by", "modified_by", "owned_by_user", "owned_by_group", "realm_entity"] {
        defs.push(format!("{} BIGINT", quoted(col)));
    }
    defs.push(format!(
        "{} BOOLEAN NOT NULL DEFAULT FALSE",
        quoted("deleted")
    ));
    defs
}

/// Create tables for every registered resource, then add foreign keys for
/// reference fields. Two passes, so link order never matters. Idempotent.
pub async fn create_tables(pool: &PgPool, registry: &ResourceRegistry) -> Result<(), ApiError> {
    for resource in registry.resources() {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            quoted(&resource.tablename()),
            column_defs(resource).join(",\n  ")
        );
        tracing::debug!(table = %resource.tablename(), "create table");
        sqlx::query(&sql).execute(pool).await?;
    }

    for resource in registry.resources() {
        for f in &resource.fields {
            let (prefix, name) = match &f.ftype {
                FieldType::Reference { prefix, name } => (prefix, name),
                _ => continue,
            };
            let target = match registry.resolve(prefix, name) {
                Ok(t) => t,
                // Unregistered target: the column stays a plain bigint.
                Err(_) => continue,
            };
            let constraint = format!("fk_{}_{}", resource.tablename(), f.name);
            let sql = format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                quoted(&resource.tablename()),
                quoted(&constraint),
                quoted(&f.name),
                quoted(&target.tablename()),
                quoted(&target.primary_key)
            );
            // Re-running against an existing constraint is not an error worth
            // failing startup over.
            if let Err(e) = sqlx::query(&sql).execute(pool).await {
                tracing::debug!(constraint = %constraint, error = %e, "foreign key skipped");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Field;

    fn course() -> Resource {
        Resource {
            prefix: "hrm".into(),
            name: "course".into(),
            fields: vec![
                Field::new("id", FieldType::Integer).not_null(),
                Field::new("name", FieldType::Str).not_null(),
                Field::new("organisation_id", FieldType::reference("org", "organisation")),
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
    fn integer_primary_key_becomes_serial() {
        let defs = column_defs(&course());
        assert_eq!(defs[0], "\"id\" BIGSERIAL PRIMARY KEY");
    }

    #[test]
    fn meta_columns_always_present() {
        let defs = column_defs(&course()).join("\n");
        assert!(defs.contains("\"uuid\" UUID NOT NULL DEFAULT gen_random_uuid()"));
        assert!(defs.contains("\"deleted\" BOOLEAN NOT NULL DEFAULT FALSE"));
        assert!(defs.contains("\"created_on\" TIMESTAMPTZ"));
        assert!(defs.contains("\"realm_entity\" BIGINT"));
    }

    #[test]
    fn reference_field_is_bigint_column() {
        let defs = column_defs(&course()).join("\n");
        assert!(defs.contains("\"organisation_id\" bigint"));
    }
}
