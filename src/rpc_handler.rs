//! RPC method handler for the download registry JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! `handle_method` dispatches one call to the registry or the settings engine
//! held by [`App`].

use std::path::Path;
use std::sync::Mutex;

use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use crate::app::App;
use crate::managers::download_registry::DownloadRegistryTrait;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::download::{DownloadRecord, Field, FieldValue};

fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, String> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing {}", name))
}

fn bool_param(params: &Value, name: &str) -> Result<bool, String> {
    params
        .get(name)
        .and_then(Value::as_bool)
        .ok_or_else(|| format!("missing {}", name))
}

/// JSON shape of one record as sent to clients.
pub fn record_to_json(record: &DownloadRecord) -> Value {
    json!({
        "id": record.id,
        "url": record.url.as_str(),
        "path": record.path,
        "filename": record.filename(),
        "mimetype": record.mimetype,
        "complete": record.complete,
        "paused": record.paused,
        "error": record.error,
        "created": record.created.to_rfc3339(),
        "incognito": record.incognito,
    })
}

/// Dispatch a JSON-RPC method call to the registry.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Downloads ───
        "download.add" => {
            let id = match params.get("id").and_then(Value::as_str) {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => Uuid::new_v4().to_string(),
            };
            let url = str_param(params, "url")?;
            let url = Url::parse(url).map_err(|e| format!("invalid url: {}", e))?;
            let path = params.get("path").and_then(Value::as_str).unwrap_or("");
            let mimetype = params.get("mimetype").and_then(Value::as_str).unwrap_or("");
            let incognito = params
                .get("incognito")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.registry.add(&id, url, path, mimetype, incognito);
            Ok(json!({"id": id}))
        }
        "download.contains" => {
            let id = str_param(params, "id")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            Ok(json!({"contains": a.registry.contains(id)}))
        }
        "download.set_complete" => {
            let id = str_param(params, "id")?;
            let complete = bool_param(params, "complete")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.registry.set_complete(id, complete);
            Ok(json!({"ok": true}))
        }
        "download.set_error" => {
            let id = str_param(params, "id")?;
            let message = str_param(params, "message")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.registry.set_error(id, message);
            Ok(json!({"ok": true}))
        }
        "download.pause" => {
            let id = str_param(params, "id")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.registry.pause(id);
            Ok(json!({"ok": true}))
        }
        "download.resume" => {
            let id = str_param(params, "id")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.registry.resume(id);
            Ok(json!({"ok": true}))
        }
        "download.cancel" => {
            let id = str_param(params, "id")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.registry.cancel(id);
            Ok(json!({"ok": true}))
        }
        "download.move_to_downloads" => {
            let id = str_param(params, "id")?;
            let source = str_param(params, "source")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            if !a.registry.move_to_downloads(id, Path::new(source)) {
                return Err(format!("could not move {} for download {}", source, id));
            }
            let path = a.registry.find(id).map(|r| r.path.clone());
            Ok(json!({"moved": true, "path": path}))
        }
        "download.delete" => {
            let path = str_param(params, "path")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.registry.delete(path);
            Ok(json!({"ok": true}))
        }
        "download.prune_incognito" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.registry.prune_incognito();
            Ok(json!({"count": a.registry.count()}))
        }
        "download.list" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let items: Vec<Value> = a.registry.records().map(record_to_json).collect();
            Ok(json!({"items": items, "count": a.registry.count()}))
        }
        "download.get" => {
            let row = params
                .get("row")
                .and_then(Value::as_i64)
                .ok_or("missing row")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let value = match (params.get("field").and_then(Value::as_str), params.get("role")) {
                (Some(name), _) => match (usize::try_from(row), Field::from_name(name)) {
                    (Ok(row), Some(field)) => a.registry.data(row, field),
                    _ => FieldValue::Invalid,
                },
                (None, Some(role)) => {
                    let role = role
                        .as_i64()
                        .and_then(|r| i32::try_from(r).ok())
                        .unwrap_or(-1);
                    a.registry.data_by_role(row, role)
                }
                (None, None) => return Err("missing field".to_string()),
            };
            Ok(json!({"valid": value.is_valid(), "value": value}))
        }
        "download.count" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            Ok(json!({"count": a.registry.count()}))
        }
        "download.role_names" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let roles: Vec<Value> = a
                .registry
                .role_names()
                .into_iter()
                .map(|(role, name)| json!({"role": role, "name": name}))
                .collect();
            Ok(json!(roles))
        }

        // ─── Store ───
        "store.path" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            Ok(json!({"path": a.registry.store_path()}))
        }
        "store.set_path" => {
            let path = str_param(params, "path")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.registry.set_store_path(path);
            Ok(json!({"path": a.registry.store_path()}))
        }
        "store.fetch_more" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.registry.fetch_more();
            Ok(json!({
                "count": a.registry.count(),
                "can_fetch_more": a.registry.can_fetch_more(),
            }))
        }
        "store.can_fetch_more" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            Ok(json!({"can_fetch_more": a.registry.can_fetch_more()}))
        }

        // ─── Settings ───
        "settings.get" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            serde_json::to_value(a.settings_engine.get_settings()).map_err(|e| e.to_string())
        }
        "settings.set" => {
            let key = str_param(params, "key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.settings_engine
                .set_value(key, value)
                .map_err(|e| e.to_string())?;
            a.apply_settings();
            Ok(json!({"ok": true}))
        }
        "settings.reset" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.settings_engine.reset().map_err(|e| e.to_string())?;
            a.apply_settings();
            Ok(json!({"ok": true}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
