use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::database::models::Principal;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({
                collection_name: []
            }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Output a list of accounts; hashes are never printed
pub fn output_principals(
    output_format: &OutputFormat,
    collection_name: &str,
    principals: &[Principal],
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({
                collection_name: principals
            }))?);
        }
        OutputFormat::Text => {
            print!("{}", principal_table(principals));
        }
    }
    Ok(())
}

fn principal_table(principals: &[Principal]) -> String {
    let mut out = format!("{:<38} {:<24} {}\n", "ID", "USERNAME", "CREATED");
    out.push_str(&"-".repeat(80));
    out.push('\n');
    for p in principals {
        out.push_str(&format!(
            "{:<38} {:<24} {}\n",
            p.id,
            p.username,
            p.created_at.format("%Y-%m-%d %H:%M")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lists_every_principal_without_hash() {
        let a = Principal::new("ada", "$2b$04$hash-a");
        let b = Principal::new("grace", "$2b$04$hash-b");
        let table = principal_table(&[a.clone(), b]);

        assert_eq!(table.lines().count(), 4);
        assert!(table.contains(&a.id.to_string()));
        assert!(table.contains("grace"));
        assert!(!table.contains("hash-"));
    }
}
