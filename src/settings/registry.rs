//! Process-wide settings composed from an ordered chain of deployment templates.
//!
//! Templates are pure contributions: a function over the registry. They append to
//! list-valued settings (pre-populate order, enabled modules, locales, currencies)
//! or overwrite scalars. After `freeze` the registry is read-only and safe to share
//! across request workers without synchronisation.

use crate::error::SettingsError;
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub type TemplateFn = Arc<dyn Fn(&mut SettingsRegistry) + Send + Sync>;

/// One enabled application module (e.g. `pr`, `hrm`, `cr`).
#[derive(Clone, Debug)]
pub struct ModuleDescriptor {
    pub key: String,
    pub name_nice: String,
    pub restricted: bool,
    pub description: String,
    /// Where `GET /{key}` redirects when the module has no landing page of its own.
    pub index_redirect: Option<String>,
}

impl ModuleDescriptor {
    pub fn new(key: &str, name_nice: &str) -> Self {
        ModuleDescriptor {
            key: key.to_string(),
            name_nice: name_nice.to_string(),
            restricted: false,
            description: String::new(),
            index_redirect: None,
        }
    }

    pub fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }

    pub fn description(mut self, d: &str) -> Self {
        self.description = d.to_string();
        self
    }

    pub fn index_redirect(mut self, target: &str) -> Self {
        self.index_redirect = Some(target.to_string());
        self
    }
}

pub struct SettingsRegistry {
    values: HashMap<String, Value>,
    modules: IndexMap<String, ModuleDescriptor>,
    templates: HashMap<String, TemplateFn>,
    applied: HashSet<String>,
    frozen: bool,
}

impl Default for SettingsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsRegistry {
    pub fn new() -> Self {
        let mut values = HashMap::new();
        // Declared defaults: reads never fail, unset is indistinguishable from these.
        values.insert("security.policy".into(), json!(1));
        values.insert("base.prepopulate".into(), json!([]));
        values.insert("base.rest_controllers".into(), json!({}));
        values.insert("L10n.default_language".into(), json!("en"));
        values.insert("L10n.languages".into(), json!(["en"]));
        values.insert("fin.currencies".into(), json!({}));
        SettingsRegistry {
            values,
            modules: IndexMap::new(),
            templates: HashMap::new(),
            applied: HashSet::new(),
            frozen: false,
        }
    }

    /// Resolve a dotted name-path. Returns Null when unset and no default exists.
    pub fn get(&self, path: &str) -> Value {
        self.values.get(path).cloned().unwrap_or(Value::Null)
    }

    pub fn get_str(&self, path: &str) -> Option<String> {
        self.values
            .get(path)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.values.get(path).and_then(|v| v.as_i64())
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.values.get(path).and_then(|v| v.as_bool())
    }

    pub fn get_list(&self, path: &str) -> Vec<Value> {
        self.values
            .get(path)
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default()
    }

    /// Overwrite a scalar setting. Composition-time only.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), SettingsError> {
        if self.frozen {
            return Err(SettingsError::FrozenSettings);
        }
        self.values.insert(path.to_string(), value);
        Ok(())
    }

    /// Append to a list-valued setting, preserving order and deduplicating by equality.
    pub fn append(&mut self, path: &str, value: Value) -> Result<(), SettingsError> {
        if self.frozen {
            return Err(SettingsError::FrozenSettings);
        }
        let entry = self
            .values
            .entry(path.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => {
                if !items.contains(&value) {
                    items.push(value);
                }
            }
            other => {
                // Promote a scalar to a list so late templates can keep appending.
                let prior = other.clone();
                let mut items = vec![prior];
                if !items.contains(&value) {
                    items.push(value);
                }
                *other = Value::Array(items);
            }
        }
        Ok(())
    }

    pub fn enable_module(&mut self, descriptor: ModuleDescriptor) -> Result<(), SettingsError> {
        if self.frozen {
            return Err(SettingsError::FrozenSettings);
        }
        self.modules.insert(descriptor.key.clone(), descriptor);
        Ok(())
    }

    /// A module absent from the enabled set is disabled.
    pub fn has_module(&self, key: &str) -> bool {
        self.modules.contains_key(key)
    }

    pub fn module(&self, key: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(key)
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values()
    }

    pub fn register_template<F>(&mut self, id: &str, f: F)
    where
        F: Fn(&mut SettingsRegistry) + Send + Sync + 'static,
    {
        self.templates.insert(id.to_string(), Arc::new(f));
    }

    /// Apply a template by id. Hierarchical ids (`Disease.COVID-19`) apply missing
    /// ancestors first, so a regional cascade layers on top of its application
    /// template without re-stating shared defaults. Each applied template's
    /// slash-path is recorded in `base.prepopulate`.
    pub fn append_template(&mut self, id: &str) -> Result<(), SettingsError> {
        if self.frozen {
            return Err(SettingsError::FrozenSettings);
        }
        let parts: Vec<&str> = id.split('.').collect();
        for depth in 1..=parts.len() {
            let chain_id = parts[..depth].join(".");
            if self.applied.contains(&chain_id) {
                continue;
            }
            let template = self
                .templates
                .get(&chain_id)
                .cloned()
                .ok_or_else(|| SettingsError::UnknownTemplate(chain_id.clone()))?;
            template(self);
            self.applied.insert(chain_id.clone());
            let slash_path = chain_id.replace('.', "/");
            self.append("base.prepopulate", Value::String(slash_path))?;
        }
        Ok(())
    }

    /// `(controller, function)` -> `(prefix, name)` from `base.rest_controllers`,
    /// stored as an object of `"controller/function": "prefix/name"` entries.
    pub fn rest_controller_override(
        &self,
        controller: &str,
        function: &str,
    ) -> Option<(String, String)> {
        let table = self.values.get("base.rest_controllers")?;
        let mapped = table.get(format!("{}/{}", controller, function))?.as_str()?;
        let (prefix, name) = mapped.split_once('/')?;
        Some((prefix.to_string(), name.to_string()))
    }

    /// Marks composition complete. Mandatory before the first request.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disease_template(s: &mut SettingsRegistry) {
        s.enable_module(ModuleDescriptor::new("disease", "Disease Tracking"))
            .unwrap();
        s.set("security.policy", json!(1)).unwrap();
    }

    fn covid_template(s: &mut SettingsRegistry) {
        s.append("L10n.languages", json!("fr")).unwrap();
    }

    #[test]
    fn get_missing_returns_default() {
        let s = SettingsRegistry::new();
        assert_eq!(s.get("security.policy"), json!(1));
        assert_eq!(s.get("no.such.path"), Value::Null);
    }

    #[test]
    fn append_preserves_order_and_dedups() {
        let mut s = SettingsRegistry::new();
        s.append("base.prepopulate", json!("A")).unwrap();
        s.append("base.prepopulate", json!("B")).unwrap();
        s.append("base.prepopulate", json!("A")).unwrap();
        assert_eq!(s.get("base.prepopulate"), json!(["A", "B"]));
    }

    #[test]
    fn list_append_composition_is_associative() {
        let apply = |s: &mut SettingsRegistry, ids: &[&str]| {
            for id in ids {
                s.append("base.prepopulate", json!(*id)).unwrap();
            }
        };
        let mut a = SettingsRegistry::new();
        apply(&mut a, &["A", "B"]);
        apply(&mut a, &["C"]);
        let mut b = SettingsRegistry::new();
        apply(&mut b, &["A", "B", "C"]);
        assert_eq!(a.get("base.prepopulate"), b.get("base.prepopulate"));
    }

    #[test]
    fn set_after_freeze_fails() {
        let mut s = SettingsRegistry::new();
        s.freeze();
        assert!(matches!(
            s.set("x", json!(1)),
            Err(SettingsError::FrozenSettings)
        ));
        assert!(matches!(
            s.append("base.prepopulate", json!("A")),
            Err(SettingsError::FrozenSettings)
        ));
    }

    #[test]
    fn unknown_template_is_an_error() {
        let mut s = SettingsRegistry::new();
        assert!(matches!(
            s.append_template("NoSuchTemplate"),
            Err(SettingsError::UnknownTemplate(_))
        ));
    }

    #[test]
    fn template_cascade_applies_parent_first() {
        let mut s = SettingsRegistry::new();
        s.register_template("Disease", disease_template);
        s.register_template("Disease.COVID-19", covid_template);
        s.append_template("Disease").unwrap();
        s.append_template("Disease.COVID-19").unwrap();

        assert_eq!(s.get("base.prepopulate"), json!(["Disease", "Disease/COVID-19"]));
        assert!(s.has_module("disease"));
        assert_eq!(s.get("security.policy"), json!(1));
        assert_eq!(s.get("L10n.languages"), json!(["en", "fr"]));
    }

    #[test]
    fn nested_template_pulls_in_missing_ancestors() {
        let mut s = SettingsRegistry::new();
        s.register_template("Disease", disease_template);
        s.register_template("Disease.COVID-19", covid_template);
        s.append_template("Disease.COVID-19").unwrap();
        assert_eq!(s.get("base.prepopulate"), json!(["Disease", "Disease/COVID-19"]));
        assert!(s.has_module("disease"));
    }

    #[test]
    fn rest_controller_override_lookup() {
        let mut s = SettingsRegistry::new();
        s.set(
            "base.rest_controllers",
            json!({"req/req": "inv/req", "vol/person": "pr/person"}),
        )
        .unwrap();
        assert_eq!(
            s.rest_controller_override("vol", "person"),
            Some(("pr".into(), "person".into()))
        );
        assert_eq!(s.rest_controller_override("br", "person"), None);
    }
}
