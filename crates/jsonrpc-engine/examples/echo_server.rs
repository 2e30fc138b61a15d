//! # Echo Server Example
//!
//! Serves newline-delimited JSON-RPC requests from stdin and writes one
//! response line per request to stdout. Notifications print nothing.
//!
//! ```text
//! $ echo '{"jsonrpc":"2.0","method":"add","params":[1,2],"id":1}' | cargo run --example echo_server
//! {"jsonrpc":"2.0","result":3,"id":1}
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use jsonrpc_engine::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct Greeting {
    name: String,
    #[serde(default)]
    shout: bool,
}

async fn echo(msg: String) -> Result<String, RpcError> {
    Ok(msg)
}

async fn add(a: i64, b: i64) -> Result<i64, RpcError> {
    a.checked_add(b)
        .ok_or_else(|| RpcError::new(1, "overflow", Some(serde_json::json!([a, b]))))
}

async fn greet(greeting: Greeting, suffix: Option<String>) -> Result<String, RpcError> {
    let text = format!("hello {}{}", greeting.name, suffix.unwrap_or_default());
    Ok(if greeting.shout { text.to_uppercase() } else { text })
}

/// Sleeps unless the request is cancelled first
async fn sleep(ctx: RequestContext, millis: u64) -> Result<bool, RpcError> {
    tokio::select! {
        _ = ctx.cancelled() => Ok(false),
        _ = tokio::time::sleep(Duration::from_millis(millis)) => Ok(true),
    }
}

/// Writes `text` straight to the connection before the response
async fn shout(ctx: RequestContext, text: String) -> Result<(), RpcError> {
    let Some(conn) = ctx.connection() else {
        return Err(RpcError::internal_error(Some("no connection".into())));
    };
    conn.write(format!("# {text}\n").as_bytes())
        .await
        .map_err(|err| RpcError::internal_error(Some(err.to_string().into())))
}

fn no_empty_names(name: &'static str, value: &Value) -> Result<(), String> {
    if name == "Greeting" && value["name"].as_str().is_some_and(str::is_empty) {
        return Err("name must not be empty".to_string());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout only carries responses
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let listener = SelectiveListener::new()
        .when_request_handled(|method, took| info!(method, took = ?took, "Handled"))
        .when_request_failed(|method, error| warn!(method, code = error.code, "Failed"));

    let mut server = Server::new(ServerConfig::default())
        .with_validator(no_empty_names)
        .with_listener(listener);

    server.register_methods([
        Method::new("echo", vec![Parameter::required("msg")], echo),
        Method::new("add", vec![Parameter::required("a"), Parameter::required("b")], add),
        Method::new(
            "greet",
            vec![Parameter::required("greeting"), Parameter::optional("suffix")],
            greet,
        ),
        Method::new("sleep", vec![Parameter::required("millis")], sleep),
        Method::new("shout", vec![Parameter::required("text")], shout),
    ])?;
    info!(methods = ?server.registered_methods(), "Serving stdin");

    let stdout = Arc::new(tokio::sync::Mutex::new(tokio::io::stdout()));
    let ctx = RequestContext::new().with_connection(stdout.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(reply) = server.handle(&ctx, line.as_bytes()).await? {
            let mut out = stdout.lock().await;
            out.write_all(&reply).await?;
            out.write_all(b"\n").await?;
            out.flush().await?;
        }
    }
    Ok(())
}
