//! Download registry RPC server: JSON-RPC over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"download.add", "params":{"url":"...","path":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Events:   {"event":"rows_inserted","first":0,"last":0}, written after the
//!           response of the request that caused them.
//!
//! Diagnostics go to stderr through `tracing`.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Mutex;

use download_registry::app::App;
use download_registry::rpc_handler::handle_method;
use download_registry::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

use serde_json::{json, Value};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the settings file location.
const CONFIG_ENV: &str = "DOWNLOAD_REGISTRY_CONFIG";

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn emit(out: &mut impl Write, value: &Value) -> io::Result<()> {
    writeln!(out, "{}", value)?;
    out.flush()
}

/// Writes the events queued since the last request.
fn emit_events(out: &mut impl Write, app: &Mutex<App>) -> io::Result<()> {
    let events = match app.lock() {
        Ok(a) => a.drain_events(),
        Err(e) => {
            error!(error = %e, "app state poisoned");
            return Ok(());
        }
    };
    for event in events {
        match serde_json::to_value(&event) {
            Ok(value) => emit(out, &value)?,
            Err(e) => warn!(?event, error = %e, "could not serialize event"),
        }
    }
    Ok(())
}

fn serve(app: &Mutex<App>) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    emit(&mut out, &json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}))?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                emit(&mut out, &json!({"id": null, "error": format!("parse error: {}", e)}))?;
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);
        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(app, method, &params) {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        emit(&mut out, &response)?;
        emit_events(&mut out, app)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let mut settings_engine = SettingsEngine::new(std::env::var(CONFIG_ENV).ok());
    let loaded = settings_engine.load();
    init_logging(&settings_engine.get_settings().logging.filter);
    if let Err(e) = loaded {
        warn!(path = settings_engine.get_config_path(), error = %e, "using default settings");
    }

    let app = match App::with_settings(settings_engine) {
        Ok(app) => Mutex::new(app),
        Err(e) => {
            error!(error = %e, "failed to initialize download registry");
            return ExitCode::FAILURE;
        }
    };

    let result = serve(&app);

    match app.lock() {
        Ok(mut a) => a.shutdown(),
        Err(e) => error!(error = %e, "app state poisoned at shutdown"),
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "stdio transport failed");
            ExitCode::FAILURE
        }
    }
}
