//! Deterministic path resolution: controller/function -> (prefix, name) plus
//! record key, component, method token, and representation.

use crate::error::ApiError;
use crate::router::request::{
    HttpVerb, MethodToken, RecordKey, Representation, ResourceRequest,
};
use crate::settings::SettingsRegistry;
use serde_json::Value;

/// Routing outcome: a resource request, or a redirect directive.
#[derive(Debug)]
pub enum Routed {
    Request(ResourceRequest),
    Redirect(String),
}

/// Translate an HTTP request into a resource request.
///
/// The module gate runs before anything else touches the database: a controller
/// absent from the enabled module set is a 404, full stop.
pub fn route(
    settings: &SettingsRegistry,
    verb: HttpVerb,
    path: &str,
    vars: Vec<(String, String)>,
    body: Option<Value>,
) -> Result<Routed, ApiError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(ApiError::NotFound("/".into()));
    }
    let mut segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();

    // Explicit extension on the last segment wins over the format query var.
    let mut extension: Option<String> = None;
    if let Some(last) = segments.last_mut() {
        if let Some((stem, ext)) = last.rsplit_once('.') {
            if !stem.is_empty() && !ext.is_empty() {
                extension = Some(ext.to_string());
                *last = stem.to_string();
            }
        }
    }

    let controller = segments[0].clone();
    if !settings.has_module(&controller) {
        return Err(ApiError::ModuleDisabled(controller));
    }

    let function = segments.get(1).cloned().unwrap_or_else(|| "index".to_string());
    if function == "index" {
        if let Some(target) = settings
            .module(&controller)
            .and_then(|m| m.index_redirect.clone())
        {
            return Ok(Routed::Redirect(target));
        }
    }

    let (prefix, name) = settings
        .rest_controller_override(&controller, &function)
        .unwrap_or((controller, function));

    let mut record = None;
    let mut component = None;
    let mut component_key = None;
    let mut method = None;

    let mut rest = segments.iter().skip(2).peekable();
    if let Some(seg) = rest.peek() {
        if let Some(key) = RecordKey::parse(seg) {
            record = Some(key);
            rest.next();
        }
    }
    if let Some(seg) = rest.peek() {
        if record.is_some() && !MethodToken::is_recognised(seg) {
            component = Some((*seg).clone());
            rest.next();
            if let Some(seg) = rest.peek() {
                if let Some(key) = RecordKey::parse(seg) {
                    component_key = Some(key);
                    rest.next();
                }
            }
        }
    }
    if let Some(seg) = rest.next() {
        method = Some(MethodToken::parse(seg));
    }

    let representation = match extension {
        Some(ext) => Representation::parse(&ext),
        None => match vars.iter().find(|(k, _)| k == "format") {
            Some((_, v)) => Representation::parse(v),
            None => Representation::Html,
        },
    };

    Ok(Routed::Request(ResourceRequest {
        verb,
        prefix,
        name,
        record,
        component,
        component_key,
        method,
        representation,
        vars,
        body,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ModuleDescriptor;
    use serde_json::json;

    fn settings() -> SettingsRegistry {
        let mut s = SettingsRegistry::new();
        s.enable_module(ModuleDescriptor::new("br", "Beneficiary Registry"))
            .unwrap();
        s.enable_module(ModuleDescriptor::new("hrm", "Human Resources"))
            .unwrap();
        s.enable_module(ModuleDescriptor::new("vol", "Volunteers")).unwrap();
        s.enable_module(
            ModuleDescriptor::new("uav", "Aerial Imagery").index_redirect("/uav/dataset"),
        )
        .unwrap();
        s.set("base.rest_controllers", json!({"vol/person": "pr/person"}))
            .unwrap();
        s.freeze();
        s
    }

    fn must_request(routed: Routed) -> ResourceRequest {
        match routed {
            Routed::Request(r) => r,
            Routed::Redirect(loc) => panic!("unexpected redirect to {}", loc),
        }
    }

    #[test]
    fn plain_list_request() {
        let s = settings();
        let r = must_request(
            route(
                &s,
                HttpVerb::Get,
                "/br/person",
                vec![("closed".into(), "0".into())],
                None,
            )
            .unwrap(),
        );
        assert_eq!(r.prefix, "br");
        assert_eq!(r.name, "person");
        assert_eq!(r.record, None);
        assert_eq!(r.method, None);
        assert_eq!(r.representation, Representation::Html);
        assert_eq!(r.var("closed"), Some("0"));
    }

    #[test]
    fn disabled_module_is_404_before_anything_else() {
        let s = settings();
        let err = route(&s, HttpVerb::Get, "/bug/report.json", vec![], None).unwrap_err();
        match err {
            ApiError::ModuleDisabled(m) => assert_eq!(m, "bug"),
            other => panic!("expected ModuleDisabled, got {:?}", other),
        }
    }

    #[test]
    fn override_table_maps_controller_function() {
        let s = settings();
        let r = must_request(route(&s, HttpVerb::Get, "/vol/person/3", vec![], None).unwrap());
        assert_eq!(r.prefix, "pr");
        assert_eq!(r.name, "person");
        assert_eq!(r.record, Some(RecordKey::Serial(3)));
    }

    #[test]
    fn component_with_key_and_method() {
        let s = settings();
        let r = must_request(
            route(&s, HttpVerb::Get, "/hrm/course/7/participant/12/update", vec![], None)
                .unwrap(),
        );
        assert_eq!(r.record, Some(RecordKey::Serial(7)));
        assert_eq!(r.component.as_deref(), Some("participant"));
        assert_eq!(r.component_key, Some(RecordKey::Serial(12)));
        assert_eq!(r.method, Some(MethodToken::Update));
    }

    #[test]
    fn uuid_record_keys_accepted() {
        let s = settings();
        let r = must_request(
            route(
                &s,
                HttpVerb::Get,
                "/br/person/9e1070ba-4f58-4a9c-8b0b-22b7bd2b0fd5",
                vec![],
                None,
            )
            .unwrap(),
        );
        assert!(matches!(r.record, Some(RecordKey::Uuid(_))));
    }

    #[test]
    fn extension_beats_format_var() {
        let s = settings();
        let r = must_request(
            route(
                &s,
                HttpVerb::Get,
                "/br/person.csv",
                vec![("format".into(), "json".into())],
                None,
            )
            .unwrap(),
        );
        assert_eq!(r.representation, Representation::Csv);

        let r = must_request(
            route(
                &s,
                HttpVerb::Get,
                "/br/person",
                vec![("format".into(), "json".into())],
                None,
            )
            .unwrap(),
        );
        assert_eq!(r.representation, Representation::Json);
    }

    #[test]
    fn unknown_representation_passes_through() {
        let s = settings();
        let r = must_request(route(&s, HttpVerb::Get, "/br/person.docx", vec![], None).unwrap());
        assert_eq!(r.representation, Representation::Other("docx".into()));
    }

    #[test]
    fn unrecognised_method_token_passes_through() {
        let s = settings();
        let r = must_request(route(&s, HttpVerb::Get, "/hrm/course/checklist", vec![], None).unwrap());
        assert_eq!(r.method, Some(MethodToken::Custom("checklist".into())));
        assert_eq!(r.record, None);
    }

    #[test]
    fn trailing_slash_ignored() {
        let s = settings();
        let a = must_request(route(&s, HttpVerb::Get, "/br/person/", vec![], None).unwrap());
        let b = must_request(route(&s, HttpVerb::Get, "/br/person", vec![], None).unwrap());
        assert_eq!(a.prefix, b.prefix);
        assert_eq!(a.name, b.name);
        assert_eq!(a.record, b.record);
    }

    #[test]
    fn module_index_redirect() {
        let s = settings();
        match route(&s, HttpVerb::Get, "/uav", vec![], None).unwrap() {
            Routed::Redirect(loc) => assert_eq!(loc, "/uav/dataset"),
            Routed::Request(r) => panic!("expected redirect, got request for {}", r.name),
        }
    }

    #[test]
    fn routing_is_deterministic() {
        let s = settings();
        let parse = || {
            must_request(
                route(
                    &s,
                    HttpVerb::Get,
                    "/hrm/course/42/participant",
                    vec![("format".into(), "json".into())],
                    None,
                )
                .unwrap(),
            )
        };
        let a = parse();
        let b = parse();
        assert_eq!(format!("{:?}", a), format!("{:?}", b));
    }
}
