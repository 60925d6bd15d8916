use clap::Subcommand;
use riskflow_core::{CatalogGateway, Category, GatewayError};
use serde_json::{Value, json};

use crate::gateway::HttpCatalog;
use crate::util::{print_json, report_gateway_error};

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// List category keys
    Categories,
    /// List events of one category
    Events {
        /// Category keyword (e.g. "clienti") or backend key
        category: String,
    },
    /// Show the description of one event
    Description {
        /// 3-digit event code (e.g. "505")
        event_code: String,
    },
    /// List the assessment questions, read-only fields included
    Fields,
}

pub async fn run(gateway: &HttpCatalog, command: CatalogCommands) -> i32 {
    match fetch(gateway, command).await {
        Ok(body) => {
            print_json(&body);
            0
        }
        Err(err) => report_gateway_error(&err),
    }
}

async fn fetch(gateway: &HttpCatalog, command: CatalogCommands) -> Result<Value, GatewayError> {
    match command {
        CatalogCommands::Categories => gateway
            .categories()
            .await
            .map(|categories| json!({ "categories": categories })),
        CatalogCommands::Events { category } => {
            let key = category_key(&category);
            gateway.raw(&["events", &key]).await
        }
        CatalogCommands::Description { event_code } => {
            gateway.raw(&["description", event_code.trim()]).await
        }
        CatalogCommands::Fields => gateway.raw(&["risk-assessment-fields"]).await,
    }
}

/// Backend keys pass through; keywords are resolved like in the interview.
fn category_key(input: &str) -> String {
    let input = input.trim();
    if let Some(category) = Category::from_backend_key(input) {
        return category.backend_key().to_string();
    }
    Category::resolve(input)
        .map(|c| c.backend_key().to_string())
        .unwrap_or_else(|| input.to_string())
}
