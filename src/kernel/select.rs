//! Method selection: verb, record key, component, and method token into the
//! dispatched operation. First match wins.

use crate::error::ApiError;
use crate::router::{HttpVerb, MethodToken, ResourceRequest};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    List { component: bool },
    Read { component: bool },
    CreateForm,
    UpdateForm,
    CreateCommit,
    UpdateCommit,
    DeleteCommit,
    Search,
    Summary,
    Import,
    Export,
    Map,
    Report,
    Purge,
    Custom(String),
}

pub fn select_operation(req: &ResourceRequest) -> Result<Operation, ApiError> {
    use HttpVerb::*;
    use MethodToken as T;

    let has_record = req.record.is_some();
    let has_component = req.component.is_some();
    let has_component_key = req.component_key.is_some();

    let op = match (req.verb, &req.method) {
        (Get, Some(T::Create)) => Operation::CreateForm,
        (Get, Some(T::Update)) if has_record => Operation::UpdateForm,
        (Get, Some(T::Search)) if !has_record => Operation::Search,
        (Get, Some(T::Summary)) if !has_record => Operation::Summary,
        (Get, Some(T::Import)) | (Post, Some(T::Import)) => Operation::Import,
        (Get, Some(T::Export)) => Operation::Export,
        (Get, Some(T::Map)) => Operation::Map,
        (Get, Some(T::Report)) => Operation::Report,
        (Post, Some(T::Purge)) | (Delete, Some(T::Purge)) => Operation::Purge,

        (Get, None) if !has_record => Operation::List { component: false },
        (Get, None) if has_component && has_component_key => Operation::Read { component: true },
        (Get, None) if has_component => Operation::List { component: true },
        (Get, None) => Operation::Read { component: false },

        (Post, None) | (Post, Some(T::Create)) if !has_record => Operation::CreateCommit,
        (Post, Some(T::Create)) if has_component => Operation::CreateCommit,
        (Post, None) if has_component && !has_component_key => Operation::CreateCommit,
        (Post, None) | (Post, Some(T::Update)) if has_component_key => Operation::UpdateCommit,
        (Post, None) | (Post, Some(T::Update)) if has_record && !has_component => {
            Operation::UpdateCommit
        }
        (Put, None) | (Put, Some(T::Update)) if has_record => Operation::UpdateCommit,
        (Post, Some(T::Delete)) | (Delete, None) | (Delete, Some(T::Delete)) if has_record => {
            Operation::DeleteCommit
        }

        (_, Some(T::Custom(name))) => Operation::Custom(name.clone()),
        (verb, method) => {
            return Err(ApiError::BadRequest(format!(
                "no operation for {:?} with method {:?}",
                verb, method
            )))
        }
    };
    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{RecordKey, Representation};

    fn req(
        verb: HttpVerb,
        record: Option<i64>,
        component: Option<&str>,
        component_key: Option<i64>,
        method: Option<MethodToken>,
    ) -> ResourceRequest {
        ResourceRequest {
            verb,
            prefix: "hrm".into(),
            name: "course".into(),
            record: record.map(RecordKey::Serial),
            component: component.map(str::to_string),
            component_key: component_key.map(RecordKey::Serial),
            method,
            representation: Representation::Html,
            vars: Vec::new(),
            body: None,
        }
    }

    #[test]
    fn selection_table_first_match() {
        use HttpVerb::*;
        use MethodToken as T;
        let cases: Vec<(ResourceRequest, Operation)> = vec![
            (req(Get, None, None, None, None), Operation::List { component: false }),
            (req(Get, Some(1), None, None, None), Operation::Read { component: false }),
            (
                req(Get, Some(1), Some("participant"), None, None),
                Operation::List { component: true },
            ),
            (
                req(Get, Some(1), Some("participant"), Some(2), None),
                Operation::Read { component: true },
            ),
            (req(Get, None, None, None, Some(T::Create)), Operation::CreateForm),
            (req(Get, Some(1), None, None, Some(T::Update)), Operation::UpdateForm),
            (req(Post, None, None, None, None), Operation::CreateCommit),
            (req(Post, None, None, None, Some(T::Create)), Operation::CreateCommit),
            (req(Post, Some(1), None, None, None), Operation::UpdateCommit),
            (req(Post, Some(1), None, None, Some(T::Update)), Operation::UpdateCommit),
            (req(Post, Some(1), None, None, Some(T::Delete)), Operation::DeleteCommit),
            (req(Delete, Some(1), None, None, None), Operation::DeleteCommit),
            (req(Get, None, None, None, Some(T::Search)), Operation::Search),
            (req(Get, None, None, None, Some(T::Summary)), Operation::Summary),
            (req(Get, None, None, None, Some(T::Import)), Operation::Import),
            (req(Get, None, None, None, Some(T::Export)), Operation::Export),
            (req(Get, None, None, None, Some(T::Map)), Operation::Map),
            (req(Get, None, None, None, Some(T::Report)), Operation::Report),
            (req(Post, Some(1), None, None, Some(T::Purge)), Operation::Purge),
            (
                req(Get, None, None, None, Some(T::Custom("checklist".into()))),
                Operation::Custom("checklist".into()),
            ),
        ];
        for (r, expected) in cases {
            assert_eq!(select_operation(&r).unwrap(), expected, "for {:?}", r);
        }
    }

    #[test]
    fn update_form_without_record_is_rejected() {
        let r = req(HttpVerb::Get, None, None, None, Some(MethodToken::Update));
        assert!(select_operation(&r).is_err());
    }
}
