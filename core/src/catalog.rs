//! Catalog data model and the gateway contract the session consumes.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

static BRACKETED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d{3})\]").expect("static regex"));

/// Fixed set of risk domains, resolved from free-text keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Damages,
    Systems,
    Employment,
    Production,
    Clients,
    InternalFraud,
    ExternalFraud,
}

impl Category {
    /// Resolution order; the first keyword that matches wins.
    pub const ALL: [Category; 7] = [
        Category::Damages,
        Category::Systems,
        Category::Employment,
        Category::Production,
        Category::Clients,
        Category::InternalFraud,
        Category::ExternalFraud,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            Category::Damages => "danni",
            Category::Systems => "sistemi",
            Category::Employment => "dipendenti",
            Category::Production => "produzione",
            Category::Clients => "clienti",
            Category::InternalFraud => "frodi interne",
            Category::ExternalFraud => "frodi esterne",
        }
    }

    /// Key the catalog service files events under.
    pub fn backend_key(&self) -> &'static str {
        match self {
            Category::Damages => "Damage_Danni",
            Category::Systems => "Business_disruption",
            Category::Employment => "Employment_practices_Dipendenti",
            Category::Production => "Execution_delivery_Problemi_di_produzione_o_consegna",
            Category::Clients => "Clients_product_Clienti",
            Category::InternalFraud => "Internal_Fraud_Frodi_interne",
            Category::ExternalFraud => "External_fraud_Frodi_esterne",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Damages => "Danni materiali",
            Category::Systems => "Interruzioni di sistema",
            Category::Employment => "Problemi con dipendenti",
            Category::Production => "Problemi di esecuzione/consegna",
            Category::Clients => "Rischi con clienti e prodotti",
            Category::InternalFraud => "Frodi interne",
            Category::ExternalFraud => "Frodi esterne",
        }
    }

    pub fn from_backend_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.backend_key() == key)
    }

    /// Case-insensitive keyword match against free text.
    ///
    /// Full keywords are tried first so "frodi esterne" is not swallowed by the
    /// internal-fraud entry; then each keyword's first word, in table order.
    pub fn resolve(input: &str) -> Option<Self> {
        let input = input.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| input.contains(c.keyword()))
            .or_else(|| {
                Self::ALL.into_iter().find(|c| {
                    c.keyword()
                        .split_whitespace()
                        .next()
                        .is_some_and(|first| input.contains(first))
                })
            })
    }
}

/// One risk scenario inside a category's event list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// 3-digit code (or the raw entry when no code could be extracted)
    pub code: String,
    pub name: String,
}

/// Event entries arrive either as objects or as `"[501] Name"` strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawEvent {
    Object {
        code: String,
        #[serde(alias = "description")]
        name: String,
    },
    Text(String),
}

impl From<RawEvent> for Event {
    fn from(raw: RawEvent) -> Self {
        match raw {
            RawEvent::Object { code, name } => Event { code, name },
            RawEvent::Text(text) => match BRACKETED_CODE.captures(&text) {
                Some(caps) => {
                    let code = caps[1].to_string();
                    let name = BRACKETED_CODE
                        .replace(&text, "")
                        .trim_matches(|c: char| c == '*' || c == '-' || c.is_whitespace())
                        .to_string();
                    Event { code, name }
                }
                None => Event {
                    code: text.clone(),
                    name: text,
                },
            },
        }
    }
}

/// Description payload as returned by the catalog; any field may be missing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DescriptionPayload {
    pub name: Option<String>,
    pub severity: Option<String>,
    pub description: Option<String>,
    pub probability: Option<String>,
    pub impact: Option<String>,
    pub controls: Option<String>,
    pub monitoring: Option<String>,
}

/// Description of one event with every gap filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescription {
    pub event_code: String,
    pub name: String,
    pub category: String,
    pub severity: String,
    pub description: String,
    pub probability: String,
    pub impact: String,
    pub controls: String,
    pub monitoring: String,
}

impl EventDescription {
    pub fn from_payload(event_code: &str, category: &str, payload: DescriptionPayload) -> Self {
        Self {
            event_code: event_code.to_string(),
            name: payload.name.unwrap_or_else(|| event_code.to_string()),
            category: category.to_string(),
            severity: payload.severity.unwrap_or_else(|| "medium".to_string()),
            description: payload.description.unwrap_or_else(|| {
                "Descrizione completa dell'evento di rischio secondo le best practice di risk management."
                    .to_string()
            }),
            probability: payload.probability.unwrap_or_else(|| "Media".to_string()),
            impact: payload.impact.unwrap_or_else(|| "Significativo".to_string()),
            controls: payload.controls.unwrap_or_else(|| "Standard".to_string()),
            monitoring: payload.monitoring.unwrap_or_else(|| "Trimestrale".to_string()),
        }
    }
}

/// A selectable answer: a bare string or a labelled value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldOption {
    Detailed {
        #[serde(default, deserialize_with = "string_or_number")]
        value: Option<String>,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        emoji: Option<String>,
    },
    Plain(String),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    })
}

impl FieldOption {
    /// Value recorded as the answer.
    pub fn value(&self) -> String {
        match self {
            FieldOption::Plain(s) => s.clone(),
            FieldOption::Detailed {
                value, label, text, ..
            } => value
                .clone()
                .or_else(|| label.clone())
                .or_else(|| text.clone())
                .unwrap_or_default(),
        }
    }

    /// Text shown to the user.
    pub fn label(&self) -> String {
        match self {
            FieldOption::Plain(s) => s.clone(),
            FieldOption::Detailed {
                value,
                label,
                text,
                emoji,
                ..
            } => {
                let base = label
                    .clone()
                    .or_else(|| text.clone())
                    .or_else(|| value.clone())
                    .unwrap_or_default();
                match (emoji, label) {
                    (Some(emoji), Some(_)) => format!("{emoji} {base}"),
                    _ => base,
                }
            }
        }
    }
}

/// One backend-declared question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentField {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<FieldOption>,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub field_name: Option<String>,
}

impl AssessmentField {
    /// Read-only (derived) fields are never asked.
    pub fn is_interactive(&self) -> bool {
        self.field_type.as_deref() != Some("readonly")
    }

    pub fn option_labels(&self) -> Vec<String> {
        self.options.iter().map(FieldOption::label).collect()
    }
}

/// Scoring response for a submitted answer set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub risk_score: f64,
    #[serde(default)]
    pub analysis: Option<String>,
}

/// Remote catalog/scoring service. Each call is one request/response round trip.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Ordered category keys.
    async fn categories(&self) -> Result<Vec<String>, GatewayError>;

    /// Ordered event entries for one category key.
    async fn events(&self, category_key: &str) -> Result<Vec<Event>, GatewayError>;

    async fn description(&self, event_code: &str) -> Result<DescriptionPayload, GatewayError>;

    /// Every declared field, read-only ones included.
    async fn assessment_fields(&self) -> Result<Vec<AssessmentField>, GatewayError>;

    async fn submit_assessment(&self, body: &Value) -> Result<ScoreResult, GatewayError>;
}
