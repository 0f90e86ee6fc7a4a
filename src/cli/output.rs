//! Output formatting for CLI commands.

use serde::Serialize;
use serde_json::Value;

use crate::cli::args::{IdiolinkArgs, OutputFormat};
use crate::error::Result;

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &IdiolinkArgs) -> Result<()> {
    println!("{}", render_result(message, result, args)?);
    Ok(())
}

/// Render a result without printing it.
pub fn render_result<T: Serialize>(
    message: &str,
    result: &T,
    args: &IdiolinkArgs,
) -> Result<String> {
    match args.output_format {
        OutputFormat::Human => render_human(message, result, args),
        OutputFormat::Json => render_json(result, args),
    }
}

/// Render in human-readable format: the message, then one `key: value`
/// line per field.
fn render_human<T: Serialize>(message: &str, result: &T, args: &IdiolinkArgs) -> Result<String> {
    let mut lines = Vec::new();
    if args.verbosity() > 0 {
        lines.push(message.to_string());
        lines.push(String::new());
    }

    match serde_json::to_value(result)? {
        Value::Object(obj) => {
            for (key, val) in obj {
                lines.push(format!("{key}: {}", format_value(&val)));
            }
        }
        value => lines.push(format_value(&value)),
    }
    Ok(lines.join("\n"))
}

fn render_json<T: Serialize>(result: &T, args: &IdiolinkArgs) -> Result<String> {
    Ok(if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    })
}

/// Format a JSON value for display.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(_) => value.to_string(),
    }
}
