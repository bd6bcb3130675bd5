//! The skeleton deployment: a minimal set of modules and resources that a
//! real deployment replaces with its own templates.

use crate::error::RegistryError;
use crate::registry::{
    CascadePolicy, ComponentOptions, CrudStrings, Field, FieldRule, FieldType, FilterOp,
    FilterWidget, ResourceOptions, ResourceRegistry,
};
use crate::settings::{ModuleDescriptor, SettingsRegistry};
use serde_json::json;

/// Register the skeleton template chain. Deployments select one with
/// `append_template` before freezing.
pub fn register_templates(settings: &mut SettingsRegistry) {
    settings.register_template("Skeleton", |s| {
        for descriptor in [
            ModuleDescriptor::new("org", "Organizations"),
            ModuleDescriptor::new("pr", "Person Registry"),
            ModuleDescriptor::new("gis", "Mapping"),
            ModuleDescriptor::new("hrm", "Human Resources"),
            ModuleDescriptor::new("support", "Support Requests"),
            ModuleDescriptor::new("uav", "Aerial Imagery").index_redirect("/uav/dataset"),
        ] {
            let _ = s.enable_module(descriptor);
        }
    });
    settings.register_template("Skeleton.Training", |s| {
        let _ = s.append("L10n.languages", json!("fr"));
    });
}

/// Register the skeleton resources and their component links.
pub fn register_resources(registry: &mut ResourceRegistry) -> Result<(), RegistryError> {
    registry.define(
        "org",
        "organisation",
        vec![
            Field::new("id", FieldType::Integer).not_null(),
            Field::new("name", FieldType::Str)
                .not_null()
                .rule(FieldRule::length(1, 256)),
        ],
        ResourceOptions::default(),
    )?;

    registry.define(
        "pr",
        "person",
        vec![
            Field::new("id", FieldType::Integer).not_null(),
            Field::new("first_name", FieldType::Str).not_null(),
            Field::new("middle_name", FieldType::Str),
            Field::new("last_name", FieldType::Str),
            Field::new("email", FieldType::Str).rule(FieldRule::default().with_format("email")),
            Field::new("organisation_id", FieldType::reference("org", "organisation")),
        ],
        ResourceOptions::default(),
    )?;

    registry.define(
        "gis",
        "location",
        vec![
            Field::new("id", FieldType::Integer).not_null(),
            Field::new("name", FieldType::Str).not_null(),
            Field::new("lat", FieldType::Double),
            Field::new("lon", FieldType::Double),
        ],
        ResourceOptions::default(),
    )?;

    let course_strings = CrudStrings {
        create_button: Some("Add Course".into()),
        title_list: Some("Courses".into()),
        title_display: Some("Course Details".into()),
        title_update: Some("Edit Course".into()),
        msg_record_created: Some("Course added".into()),
        msg_list_empty: Some("No Courses currently registered".into()),
        ..Default::default()
    };
    registry.define(
        "hrm",
        "course",
        vec![
            Field::new("id", FieldType::Integer).not_null(),
            Field::new("name", FieldType::Str)
                .not_null()
                .rule(FieldRule::length(1, 128)),
            Field::new("fee", FieldType::Decimal { precision: 10, scale: 2 }),
            Field::new(
                "level",
                FieldType::Choice(vec!["basic".into(), "advanced".into()]),
            ),
            Field::new("start_date", FieldType::Date),
        ],
        ResourceOptions::default()
            .with_crud_strings(course_strings)
            .with_filter_widget(FilterWidget::new("name__contains", "name", FilterOp::Contains)),
    )?;

    registry.define(
        "hrm",
        "training",
        vec![
            Field::new("id", FieldType::Integer).not_null(),
            Field::new("course_id", FieldType::reference("hrm", "course")).not_null(),
            Field::new("person_id", FieldType::reference("pr", "person")).not_null(),
            Field::new("date", FieldType::Date),
            Field::new(
                "grade",
                FieldType::Choice(vec!["pass".into(), "fail".into()]),
            ),
        ],
        ResourceOptions::default(),
    )?;
    registry.define_component(
        ("hrm", "course"),
        ("hrm", "training"),
        "course_id",
        ComponentOptions {
            multiple: true,
            cascade: CascadePolicy::Cascade,
        },
    )?;

    registry.define(
        "support",
        "req",
        vec![
            Field::new("id", FieldType::Integer).not_null(),
            Field::new("subject", FieldType::Str)
                .not_null()
                .rule(FieldRule::length(1, 256)),
            Field::new("details", FieldType::Text),
            Field::new("priority", FieldType::Integer).rule(FieldRule::range(1.0, 5.0)),
            Field::new("closed", FieldType::Boolean).default_value(json!(false)),
            Field::new("location_id", FieldType::Location),
        ],
        ResourceOptions::default(),
    )?;

    registry.define(
        "uav",
        "dataset",
        vec![
            Field::new("id", FieldType::Integer).not_null(),
            Field::new("name", FieldType::Str).not_null(),
            Field::new("captured_on", FieldType::Date),
        ],
        ResourceOptions::default(),
    )?;

    Ok(())
}
