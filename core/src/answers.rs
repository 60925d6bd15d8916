use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field id of the control-adequacy question.
pub const CONTROL_FIELD_ID: &str = "controllo";
/// Field id of the value derived from the control answer.
pub const CONTROL_DESCRIPTION_FIELD_ID: &str = "descrizione_controllo";

/// Field id → chosen option value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentAnswers(BTreeMap<String, String>);

impl AssessmentAnswers {
    pub fn record(&mut self, field_id: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field_id.into(), value.into());
    }

    pub fn get(&self, field_id: &str) -> Option<&str> {
        self.0.get(field_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Body posted for scoring: the event under assessment plus every answer.
    pub fn submission_body(&self, event_code: &str, category: &str) -> Value {
        let mut body = Map::new();
        body.insert("eventCode".to_string(), Value::from(event_code));
        body.insert("category".to_string(), Value::from(category));
        for (field, value) in self.iter() {
            body.insert(field.to_string(), Value::from(value));
        }
        Value::Object(body)
    }
}

/// Derived text for one control-adequacy value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlDescription {
    pub value: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

impl ControlDescription {
    /// Text stored under [`CONTROL_DESCRIPTION_FIELD_ID`].
    pub fn summary(&self) -> String {
        format!("✓ {}\n{}", self.title, self.description)
    }
}

const CONTROL_DESCRIPTIONS: [ControlDescription; 4] = [
    ControlDescription {
        value: "++",
        title: "Adeguato",
        description: "Il sistema di controllo interno è efficace ed adeguato (controlli 1 e 2 sono attivi e consolidati)",
    },
    ControlDescription {
        value: "+",
        title: "Sostanzialmente adeguato",
        description: "Alcune correzioni potrebbero rendere soddisfacente il sistema di controllo interno (controlli 1 e 2 presenti ma parzialmente strutturati)",
    },
    ControlDescription {
        value: "-",
        title: "Parzialmente Adeguato",
        description: "Il sistema di controllo interno deve essere migliorato e il processo dovrebbe essere più strettamente controllato (controlli 1 e 2 NON formalizzati)",
    },
    ControlDescription {
        value: "--",
        title: "Non adeguato / assente",
        description: "Il sistema di controllo interno dei processi deve essere riorganizzato immediatamente (livelli di controllo 1 e 2 NON attivi)",
    },
];

/// Stored under [`CONTROL_DESCRIPTION_FIELD_ID`] when the control value has no entry.
pub const CONTROL_DESCRIPTION_PLACEHOLDER: &str =
    "Seleziona un livello di controllo per vedere la descrizione";

/// Exact-match lookup; unknown values have no description.
pub fn describe_control(value: &str) -> Option<ControlDescription> {
    CONTROL_DESCRIPTIONS
        .iter()
        .find(|entry| entry.value == value)
        .copied()
}

/// Derived field value for a control answer; never empty.
pub fn control_summary(value: &str) -> String {
    describe_control(value)
        .map(|control| control.summary())
        .unwrap_or_else(|| CONTROL_DESCRIPTION_PLACEHOLDER.to_string())
}

/// Qualitative tier of a 0–100 risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            RiskLevel::Critical
        } else if score >= 50.0 {
            RiskLevel::High
        } else if score >= 25.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }
}
