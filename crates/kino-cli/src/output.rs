//! Output formatting for CLI

use kino_element::ElementConfig;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// One entry of a video, audio or text track list
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct TrackRow {
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Id")]
    pub id: String,
    #[tabled(rename = "Label")]
    pub label: String,
    #[tabled(rename = "Language")]
    pub language: String,
    #[tabled(rename = "State")]
    pub state: String,
}

/// Track lists after the manifest loaded and selections were applied
#[derive(Debug, Serialize)]
pub struct TrackReport {
    pub src: String,
    pub session_id: Option<String>,
    pub rows: Vec<TrackRow>,
    pub engine_commands: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ClassifyReport {
    #[tabled(rename = "Source")]
    pub src: String,
    #[tabled(rename = "Type hint")]
    pub mime: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
}

#[derive(Tabled)]
struct Setting {
    #[tabled(rename = "Setting")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn print_tracks(report: &TrackReport, format: &str) -> anyhow::Result<()> {
    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => {
            println!("{}", Table::new(report.rows.clone()));
            print_commands(&report.engine_commands);
        }
        OutputFormat::Text => {
            println!("Source: {}", report.src);
            if let Some(session) = &report.session_id {
                println!("Session: {}", session);
            }
            println!("\nTracks:");
            for row in &report.rows {
                println!(
                    "  [{}] {} - {} ({}) {}",
                    row.kind, row.id, row.label, row.language, row.state
                );
            }
            print_commands(&report.engine_commands);
        }
    }
    Ok(())
}

fn print_commands(commands: &[String]) {
    println!("\nEngine commands:");
    for (i, command) in commands.iter().enumerate() {
        println!("  {}. {}", i + 1, command);
    }
}

pub fn print_classification(report: &ClassifyReport, format: &str) -> anyhow::Result<()> {
    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => println!("{}", Table::new([report.clone()])),
        OutputFormat::Text => println!("{}", report.kind),
    }
    Ok(())
}

pub fn print_config(config: &ElementConfig, format: &str) -> anyhow::Result<()> {
    match OutputFormat::from(format) {
        OutputFormat::Table => {
            let mut settings = Vec::new();
            flatten("", &serde_json::to_value(config)?, &mut settings);
            println!("{}", Table::new(settings));
        }
        OutputFormat::Json | OutputFormat::Text => println!("{}", config.to_json()),
    }
    Ok(())
}

/// Flatten nested objects into dotted keys
fn flatten(prefix: &str, value: &serde_json::Value, out: &mut Vec<Setting>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&key, value, out);
            }
        }
        other => out.push(Setting {
            key: prefix.to_string(),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert!(matches!(OutputFormat::from("JSON"), OutputFormat::Json));
        assert!(matches!(OutputFormat::from("table"), OutputFormat::Table));
        assert!(matches!(OutputFormat::from("other"), OutputFormat::Text));
    }

    #[test]
    fn test_flatten_config() {
        let mut settings = Vec::new();
        let value = serde_json::to_value(ElementConfig::default()).unwrap();
        flatten("", &value, &mut settings);

        let keys: Vec<_> = settings.iter().map(|s| s.key.as_str()).collect();
        assert!(keys.contains(&"engine.live_sync_duration_count"));
        assert!(keys.contains(&"max_dispatch_rounds"));
        let preference = settings.iter().find(|s| s.key == "preference").unwrap();
        assert_eq!(preference.value, "\"mse\"");
    }
}
