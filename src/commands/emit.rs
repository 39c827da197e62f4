//! Implementation of the `adw emit` and `adw events` commands.

use super::App;
use crate::cli::EmitArgs;
use adw::error::{AdwError, Result};
use adw::events::{DeliveryStatus, DispatchReport, EmitContext};
use serde_json::{Map, Value};

/// Execute the `adw emit` command.
///
/// Only a contract violation fails the command, unless `--strict` asks for
/// delivery failures to fail it as well.
pub fn cmd_emit(args: EmitArgs, app: &App) -> Result<()> {
    let data = parse_data(args.data_json.as_deref(), &args.data)?;
    let context = EmitContext {
        workflow: args.workflow,
        adw_id: args.adw_id,
        issue_number: args.issue,
        stage: args.stage,
    };

    let report = app.router.emit(&args.event_type, data, &context)?;
    print_report(&report);

    let failed = report.failed();
    if args.strict && !failed.is_empty() {
        let platforms: Vec<&str> = failed.iter().map(|d| d.platform.as_str()).collect();
        return Err(AdwError::DeliveryError(format!(
            "event '{}' not delivered to: {}",
            report.event_type,
            platforms.join(", ")
        )));
    }

    Ok(())
}

/// Execute the `adw events` command.
pub fn cmd_events(app: &App) -> Result<()> {
    let taxonomy = app.router.taxonomy();

    if taxonomy.is_empty() {
        println!("No event types defined.");
        return Ok(());
    }

    println!("Event types ({}):", taxonomy.len());
    println!();
    for event_type in taxonomy.event_types() {
        let Some(definition) = taxonomy.get(event_type) else {
            continue;
        };
        println!(
            "  {:<32} {:<10} {:<8} [{}]",
            event_type,
            definition.category,
            definition.severity,
            definition.platforms.join(", ")
        );
    }

    Ok(())
}

fn print_report(report: &DispatchReport) {
    if report.is_empty() {
        println!("No handlers invoked for '{}'.", report.event_type);
        return;
    }

    for delivery in &report.deliveries {
        let status = match &delivery.status {
            DeliveryStatus::Delivered => "delivered".to_string(),
            DeliveryStatus::Failed(reason) => format!("failed: {}", reason),
            DeliveryStatus::TimedOut => "timed out".to_string(),
        };
        let note = match (&delivery.status, delivery.best_effort) {
            (DeliveryStatus::Delivered, _) | (_, false) => "",
            (_, true) => " (best effort, ignored)",
        };
        println!("  {}: {}{}", delivery.platform, status, note);
    }
}

/// Merge `--data-json` and `KEY=VALUE` pairs into the event data.
///
/// Pair values that parse as JSON keep their type; anything else is a string.
fn parse_data(data_json: Option<&str>, pairs: &[String]) -> Result<Map<String, Value>> {
    let mut data = match data_json {
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(AdwError::UserError(
                    "--data-json must be a JSON object".to_string(),
                ));
            }
            Err(e) => {
                return Err(AdwError::UserError(format!("invalid --data-json: {}", e)));
            }
        },
        None => Map::new(),
    };

    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(AdwError::UserError(format!(
                "invalid --data '{}': expected KEY=VALUE",
                pair
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(AdwError::UserError(format!(
                "invalid --data '{}': empty key",
                pair
            )));
        }

        let value =
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        data.insert(key.to_string(), value);
    }

    Ok(data)
}
