//! The resource catalogue: registration, lookup, component linkage.

use crate::error::RegistryError;
use crate::registry::resource::{
    ComponentLink, ComponentOptions, CrudStrings, Resource, ResourceOptions,
};
use crate::registry::Field;
use indexmap::IndexMap;

/// Catalogue mapping `(prefix, name)` to resource descriptors. Populated at
/// process initialisation, then frozen; read-only at request time.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: IndexMap<(String, String), Resource>,
    frozen: bool,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(
        &mut self,
        prefix: &str,
        name: &str,
        fields: Vec<Field>,
        options: ResourceOptions,
    ) -> Result<(), RegistryError> {
        if self.frozen {
            return Err(RegistryError::FrozenRegistry);
        }
        let key = (prefix.to_string(), name.to_string());
        if self.resources.contains_key(&key) && !options.replace {
            return Err(RegistryError::DuplicateResource {
                prefix: prefix.to_string(),
                name: name.to_string(),
            });
        }
        let pk = options.primary_key.unwrap_or_else(|| "id".to_string());
        if !fields.iter().any(|f| f.name == pk) {
            return Err(RegistryError::MissingPrimaryKey {
                prefix: prefix.to_string(),
                name: name.to_string(),
                pk,
            });
        }
        let resource = Resource {
            prefix: prefix.to_string(),
            name: name.to_string(),
            fields,
            primary_key: pk,
            crud_strings: options.crud_strings.unwrap_or_default(),
            components: Vec::new(),
            rheader: options.rheader,
            custom_form: options.custom_form,
            methods: options.methods,
            filter_widgets: options.filter_widgets,
            customise: options.customise,
        };
        self.resources.insert(key, resource);
        Ok(())
    }

    /// Establish a parent -> child link joined on `join_field` of the child.
    /// The join field must be a reference to the parent resource.
    pub fn define_component(
        &mut self,
        parent: (&str, &str),
        child: (&str, &str),
        join_field: &str,
        options: ComponentOptions,
    ) -> Result<(), RegistryError> {
        if self.frozen {
            return Err(RegistryError::FrozenRegistry);
        }
        let parent_key = (parent.0.to_string(), parent.1.to_string());
        let child_key = (child.0.to_string(), child.1.to_string());
        if !self.resources.contains_key(&parent_key) {
            return Err(RegistryError::UnknownResource {
                prefix: parent.0.to_string(),
                name: parent.1.to_string(),
            });
        }
        let child_resource =
            self.resources
                .get(&child_key)
                .ok_or_else(|| RegistryError::UnknownResource {
                    prefix: child.0.to_string(),
                    name: child.1.to_string(),
                })?;
        if !child_resource.field_references(join_field, parent.0, parent.1) {
            return Err(RegistryError::TypeMismatch {
                parent: format!("{}_{}", parent.0, parent.1),
                field: join_field.to_string(),
            });
        }
        if self.reachable(&child_key, &parent_key) {
            return Err(RegistryError::ComponentCycle {
                parent: format!("{}_{}", parent.0, parent.1),
                child: format!("{}_{}", child.0, child.1),
            });
        }
        let link = ComponentLink {
            child_prefix: child.0.to_string(),
            child_name: child.1.to_string(),
            join_field: join_field.to_string(),
            multiple: options.multiple,
            cascade: options.cascade,
        };
        self.resources
            .get_mut(&parent_key)
            .expect("parent checked above")
            .components
            .push(link);
        Ok(())
    }

    /// Whether `to` is reachable from `from` along component edges.
    fn reachable(&self, from: &(String, String), to: &(String, String)) -> bool {
        if from == to {
            return true;
        }
        let mut stack = vec![from.clone()];
        let mut seen = std::collections::HashSet::new();
        while let Some(key) = stack.pop() {
            if !seen.insert(key.clone()) {
                continue;
            }
            if let Some(r) = self.resources.get(&key) {
                for link in &r.components {
                    let next = (link.child_prefix.clone(), link.child_name.clone());
                    if next == *to {
                        return true;
                    }
                    stack.push(next);
                }
            }
        }
        false
    }

    pub fn resolve(&self, prefix: &str, name: &str) -> Result<&Resource, RegistryError> {
        self.resources
            .get(&(prefix.to_string(), name.to_string()))
            .ok_or_else(|| RegistryError::UnknownResource {
                prefix: prefix.to_string(),
                name: name.to_string(),
            })
    }

    /// Merge a bundle onto an existing resource; missing keys keep prior values.
    pub fn set_crud_strings(
        &mut self,
        prefix: &str,
        name: &str,
        bundle: CrudStrings,
    ) -> Result<(), RegistryError> {
        if self.frozen {
            return Err(RegistryError::FrozenRegistry);
        }
        let resource = self
            .resources
            .get_mut(&(prefix.to_string(), name.to_string()))
            .ok_or_else(|| RegistryError::UnknownResource {
                prefix: prefix.to_string(),
                name: name.to_string(),
            })?;
        resource.crud_strings.merge(bundle);
        Ok(())
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FieldType, ResourceOptions};

    fn id_field() -> Field {
        Field::new("id", FieldType::Integer).not_null()
    }

    fn registry_with_person() -> ResourceRegistry {
        let mut reg = ResourceRegistry::new();
        reg.define(
            "pr",
            "person",
            vec![
                id_field(),
                Field::new("first_name", FieldType::Str).not_null(),
                Field::new("last_name", FieldType::Str),
            ],
            ResourceOptions::default(),
        )
        .unwrap();
        reg
    }

    #[test]
    fn duplicate_definition_rejected_unless_replace() {
        let mut reg = registry_with_person();
        let err = reg
            .define("pr", "person", vec![id_field()], ResourceOptions::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateResource { .. }));

        let mut opts = ResourceOptions::default();
        opts.replace = true;
        reg.define("pr", "person", vec![id_field()], opts).unwrap();
    }

    #[test]
    fn missing_primary_key_rejected() {
        let mut reg = ResourceRegistry::new();
        let err = reg
            .define(
                "pr",
                "contact",
                vec![Field::new("value", FieldType::Str)],
                ResourceOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn component_join_field_must_reference_parent() {
        let mut reg = registry_with_person();
        reg.define(
            "pr",
            "address",
            vec![
                id_field(),
                Field::new("person_id", FieldType::reference("pr", "person")),
                Field::new("location", FieldType::Str),
            ],
            ResourceOptions::default(),
        )
        .unwrap();

        let err = reg
            .define_component(
                ("pr", "person"),
                ("pr", "address"),
                "location",
                ComponentOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::TypeMismatch { .. }));

        reg.define_component(
            ("pr", "person"),
            ("pr", "address"),
            "person_id",
            ComponentOptions::default(),
        )
        .unwrap();
        let person = reg.resolve("pr", "person").unwrap();
        assert!(person.component("address").is_some());
    }

    #[test]
    fn component_cycles_rejected() {
        let mut reg = ResourceRegistry::new();
        reg.define(
            "org",
            "organisation",
            vec![
                id_field(),
                Field::new("branch_id", FieldType::reference("org", "office")),
            ],
            ResourceOptions::default(),
        )
        .unwrap();
        reg.define(
            "org",
            "office",
            vec![
                id_field(),
                Field::new("organisation_id", FieldType::reference("org", "organisation")),
            ],
            ResourceOptions::default(),
        )
        .unwrap();
        reg.define_component(
            ("org", "organisation"),
            ("org", "office"),
            "organisation_id",
            ComponentOptions::default(),
        )
        .unwrap();
        let err = reg
            .define_component(
                ("org", "office"),
                ("org", "organisation"),
                "branch_id",
                ComponentOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::ComponentCycle { .. }));
    }

    #[test]
    fn crud_strings_merge_preserves_prior_values() {
        let mut reg = registry_with_person();
        reg.set_crud_strings(
            "pr",
            "person",
            CrudStrings {
                title_list: Some("Persons".into()),
                msg_record_created: Some("Person added".into()),
                ..Default::default()
            },
        )
        .unwrap();
        reg.set_crud_strings(
            "pr",
            "person",
            CrudStrings {
                title_list: Some("People".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let person = reg.resolve("pr", "person").unwrap();
        assert_eq!(person.crud_strings.title_list.as_deref(), Some("People"));
        assert_eq!(person.crud_strings.record_created(), "Person added");
    }

    #[test]
    fn resolve_unknown_resource() {
        let reg = registry_with_person();
        assert!(matches!(
            reg.resolve("bug", "report"),
            Err(RegistryError::UnknownResource { .. })
        ));
    }

    #[test]
    fn frozen_registry_rejects_definition() {
        let mut reg = registry_with_person();
        reg.freeze();
        let err = reg
            .define("hrm", "course", vec![id_field()], ResourceOptions::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::FrozenRegistry));
    }
}
