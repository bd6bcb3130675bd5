//! Flat-format serialisation owned by the kernel: CSV and XML. Document
//! representations (html, pdf, xls, geojson, kml) go to the view collaborator.

use serde_json::Value;

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn scalar_to_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Rows as CSV with a header line. Column order is the declared field order.
pub fn rows_to_csv(columns: &[String], rows: &[Value]) -> String {
    let mut out = String::new();
    out.push_str(
        &columns
            .iter()
            .map(|c| csv_escape(c))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');
    for row in rows {
        let line = columns
            .iter()
            .map(|c| csv_escape(&scalar_to_string(row.get(c).unwrap_or(&Value::Null))))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn write_record(out: &mut String, record: &Value) {
    out.push_str("<record>");
    if let Value::Object(map) = record {
        for (k, v) in map {
            out.push_str(&format!(
                "<{k}>{}</{k}>",
                xml_escape(&scalar_to_string(v)),
                k = xml_escape(k)
            ));
        }
    }
    out.push_str("</record>");
}

/// Records as a flat XML document rooted at the resource's table name.
pub fn to_xml(root: &str, context: &Value) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    out.push_str(&format!("<{}>", xml_escape(root)));
    if let Some(rows) = context.get("rows").and_then(|v| v.as_array()) {
        for row in rows {
            write_record(&mut out, row);
        }
    } else if let Some(record) = context.get("record") {
        write_record(&mut out, record);
    }
    out.push_str(&format!("</{}>", xml_escape(root)));
    out
}
