use std::time::Duration;

use riskflow_core::GatewayError;
use serde::Serialize;
use serde_json::json;

pub fn client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", pretty(&err));
    std::process::exit(1);
}

pub fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"raw_error\": \"{e}\"}}"))
}

pub fn print_json<T: Serialize>(value: &T) {
    println!("{}", pretty(value));
}

/// Exit codes: 0=success, 1=client error (4xx), 2=server error (5xx) or
/// undecodable response, 3=connection error, 4=usage error
pub fn exit_code(err: &GatewayError) -> i32 {
    match err {
        GatewayError::Status { status, .. } if (400..500).contains(status) => 1,
        GatewayError::Status { .. } | GatewayError::Decode(_) => 2,
        GatewayError::Transport(_) => 3,
        GatewayError::InvalidUrl(_) => 4,
    }
}

/// Print a gateway failure as a structured error body and return its exit code.
pub fn report_gateway_error(err: &GatewayError) -> i32 {
    let body = match err {
        GatewayError::Transport(message) => json!({
            "error": "connection_error",
            "message": message,
            "docs_hint": "Is the catalog service running? Check RISKFLOW_API_URL."
        }),
        other => json!({
            "error": "gateway_error",
            "message": other.to_string()
        }),
    };
    eprintln!("{}", pretty(&body));
    exit_code(err)
}
