//! View collaborator seam. The kernel owns only the structured context; hosts
//! install a renderer for the document representations.

use crate::error::ApiError;
use crate::router::Representation;
use serde_json::Value;

pub struct RenderedDoc {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub trait ViewRenderer: Send + Sync {
    fn render(&self, representation: &Representation, context: &Value)
        -> Result<RenderedDoc, ApiError>;
}

/// Minimal default: a bare HTML dump of the context. Document formats
/// (pdf, xls, geojson, kml) require a real renderer.
pub struct BasicRenderer;

impl ViewRenderer for BasicRenderer {
    fn render(
        &self,
        representation: &Representation,
        context: &Value,
    ) -> Result<RenderedDoc, ApiError> {
        match representation {
            Representation::Html => {
                let title = context
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or("relief-rest");
                let body = serde_json::to_string_pretty(context)
                    .map_err(|e| ApiError::Fatal(e.to_string()))?;
                let html = format!(
                    "<!DOCTYPE html><html><head><title>{}</title></head><body><pre>{}</pre></body></html>",
                    escape(title),
                    escape(&body)
                );
                Ok(RenderedDoc {
                    content_type: "text/html; charset=utf-8",
                    bytes: html.into_bytes(),
                })
            }
            other => Err(ApiError::UnsupportedRepresentation(other.as_str().to_string())),
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
