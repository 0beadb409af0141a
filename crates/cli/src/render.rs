use advisor_core::domain::recommendation::{NormalizedRecommendation, Record, REQUIRED_FIELDS};
use serde_json::Value;
use std::fmt::Write;

pub fn summary(rec: &NormalizedRecommendation) -> String {
    let mut out = String::new();

    if let Some(Value::Array(funds)) = rec.extra.get("Top_Mutual_Funds") {
        let names: Vec<&str> = funds
            .iter()
            .filter_map(|f| f.get("Fund_Name").and_then(Value::as_str))
            .collect();
        if !names.is_empty() {
            let _ = writeln!(out, "== Top Mutual Funds ==");
            for name in names {
                let _ = writeln!(out, "  - {name}");
            }
            out.push('\n');
        }
    }

    for field in REQUIRED_FIELDS {
        let _ = writeln!(out, "== {} ==", field.replace('_', " "));
        for (i, record) in rec.required(field).unwrap_or_default().iter().enumerate() {
            write_record(&mut out, i + 1, record);
        }
        out.push('\n');
    }

    let missing = rec.missing_presentation_fields();
    if !missing.is_empty() {
        let _ = writeln!(out, "(not provided: {})", missing.join(", "));
    }
    out
}

fn write_record(out: &mut String, n: usize, record: &Record) {
    if record.is_empty() {
        let _ = writeln!(out, "  {n}. (no data)");
        return;
    }
    let _ = writeln!(out, "  {n}.");
    for (key, value) in record {
        let shown = match value {
            Value::String(s) => s.clone(),
            Value::Array(items) => format!("[{} item(s)]", items.len()),
            other => other.to_string(),
        };
        let _ = writeln!(out, "     {}: {shown}", key.replace('_', " "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::advice::json::normalize_value;
    use serde_json::json;

    #[test]
    fn placeholders_render_as_no_data() {
        let rec = normalize_value(json!({
            "Market_Trends": [{"Trend": "Rate cuts", "Supporting_Data": [{}, {}]}],
            "Top_Mutual_Funds": [{"Fund_Name": "Bluechip Growth"}],
        }))
        .unwrap();

        let text = summary(&rec);
        assert!(text.contains("== Top Mutual Funds ==\n  - Bluechip Growth"));
        assert!(text.contains("     Trend: Rate cuts"));
        assert!(text.contains("     Supporting Data: [2 item(s)]"));
        assert!(text.contains("== Risk Assessment ==\n  1. (no data)"));
        assert!(text.contains("(not provided: Investment_Actions, Diversification_Strategies, Sample_Investment_Plan)"));
    }
}
