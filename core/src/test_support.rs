use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::{
    AssessmentField, CatalogGateway, Category, DescriptionPayload, Event, FieldOption, ScoreResult,
};
use crate::config::SessionConfig;
use crate::error::GatewayError;
use crate::session::Session;
use crate::transcript::Transcript;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Categories,
    Events,
    Description,
    Fields,
    Submit,
}

/// In-memory catalog with scripted failures and per-call counters.
pub struct FakeCatalog {
    events: Vec<Event>,
    fields: Vec<AssessmentField>,
    score: f64,
    failures: Mutex<HashMap<Op, usize>>,
    calls: Mutex<HashMap<Op, usize>>,
    submissions: Mutex<Vec<Value>>,
}

const EVENT_NAMES: [&str; 12] = [
    "Vendita scorretta di prodotti",
    "Reclami non gestiti",
    "Pratiche commerciali aggressive",
    "Errori contrattuali",
    "Violazione privacy dei clienti",
    "Prodotto difettoso",
    "Pubblicità ingannevole",
    "Conflitto di interessi",
    "Abuso di informazioni riservate",
    "Mancata adeguata verifica",
    "Violazione antiriciclaggio",
    "Errata consulenza",
];

fn graded(id: &str, question: &str) -> AssessmentField {
    let labels = ["Basso", "Medio", "Alto", "Critico"];
    AssessmentField {
        id: id.to_string(),
        question: question.to_string(),
        options: labels
            .iter()
            .enumerate()
            .map(|(i, label)| FieldOption::Detailed {
                value: Some((i + 1).to_string()),
                label: Some(label.to_string()),
                text: None,
                description: None,
                emoji: None,
            })
            .collect(),
        field_type: Some("select".to_string()),
        field_name: None,
    }
}

fn control_field() -> AssessmentField {
    let options = [
        ("++", "Adeguato", "🟢"),
        ("+", "Sostanzialmente adeguato", "🟡"),
        ("-", "Parzialmente Adeguato", "🟠"),
        ("--", "Non adeguato / assente", "🔴"),
    ];
    AssessmentField {
        id: "controllo".to_string(),
        question: "Come valuti l'adeguatezza dei controlli esistenti?".to_string(),
        options: options
            .iter()
            .map(|(value, label, emoji)| FieldOption::Detailed {
                value: Some(value.to_string()),
                label: Some(label.to_string()),
                text: None,
                description: None,
                emoji: Some(emoji.to_string()),
            })
            .collect(),
        field_type: Some("select".to_string()),
        field_name: None,
    }
}

impl FakeCatalog {
    /// Twelve client events (501..512) and seven questions, the control one sixth.
    pub fn new() -> Self {
        let events = EVENT_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| Event {
                code: (501 + i).to_string(),
                name: name.to_string(),
            })
            .collect();
        let fields = vec![
            graded("impatto_finanziario", "Qual è l'impatto finanziario stimato?"),
            graded("perdita_economica", "Qual è la perdita economica potenziale?"),
            graded("impatto_immagine", "Qual è l'impatto sull'immagine aziendale?"),
            graded("impatto_regolamentare", "Qual è l'impatto regolamentare?"),
            graded("impatto_criminale", "Qual è il rischio di impatto penale?"),
            control_field(),
            graded("probabilita", "Con quale frequenza può verificarsi l'evento?"),
            AssessmentField {
                id: "descrizione_controllo".to_string(),
                question: "Descrizione del controllo".to_string(),
                options: Vec::new(),
                field_type: Some("readonly".to_string()),
                field_name: None,
            },
        ];
        Self {
            events,
            fields,
            score: 42.0,
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_fields(mut self, fields: Vec<AssessmentField>) -> Self {
        self.fields = fields;
        self
    }

    /// Make the next `times` calls of `op` fail.
    pub fn failing(self, op: Op, times: usize) -> Self {
        self.failures.lock().unwrap().insert(op, times);
        self
    }

    pub fn fail_next(&self, op: Op, times: usize) {
        self.failures.lock().unwrap().insert(op, times);
    }

    pub fn calls(&self, op: Op) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    pub fn submissions(&self) -> Vec<Value> {
        self.submissions.lock().unwrap().clone()
    }

    fn hit(&self, op: Op) -> Result<(), GatewayError> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&op) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(GatewayError::Status {
                    status: 503,
                    message: "scripted failure".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl CatalogGateway for FakeCatalog {
    async fn categories(&self) -> Result<Vec<String>, GatewayError> {
        self.hit(Op::Categories)?;
        Ok(Category::ALL
            .iter()
            .map(|c| c.backend_key().to_string())
            .collect())
    }

    async fn events(&self, category_key: &str) -> Result<Vec<Event>, GatewayError> {
        self.hit(Op::Events)?;
        if category_key == Category::Clients.backend_key() {
            Ok(self.events.clone())
        } else {
            Ok(self.events.iter().take(3).cloned().collect())
        }
    }

    async fn description(&self, event_code: &str) -> Result<DescriptionPayload, GatewayError> {
        self.hit(Op::Description)?;
        let name = self
            .events
            .iter()
            .find(|e| e.code == event_code)
            .map(|e| e.name.clone());
        Ok(DescriptionPayload {
            name,
            severity: Some("high".to_string()),
            ..DescriptionPayload::default()
        })
    }

    async fn assessment_fields(&self) -> Result<Vec<AssessmentField>, GatewayError> {
        self.hit(Op::Fields)?;
        Ok(self.fields.clone())
    }

    async fn submit_assessment(&self, body: &Value) -> Result<ScoreResult, GatewayError> {
        self.hit(Op::Submit)?;
        self.submissions.lock().unwrap().push(body.clone());
        Ok(ScoreResult {
            risk_score: self.score,
            analysis: Some("Rischio da monitorare".to_string()),
        })
    }
}

pub type TestSession = Session<FakeCatalog, Transcript>;

pub fn session(catalog: FakeCatalog) -> TestSession {
    Session::new(catalog, Transcript::new(), SessionConfig::default())
}

/// Session sitting at WaitingChoice with event 505 of the clients category selected.
pub async fn session_at_choice(catalog: FakeCatalog) -> TestSession {
    let mut session = session(catalog);
    for input in ["rischi", "clienti", "505"] {
        session.handle_input(input).await.unwrap();
    }
    session
}

/// Session sitting at question `number`, every earlier question answered with option 1.
pub async fn session_at_question(catalog: FakeCatalog, number: usize) -> TestSession {
    let mut session = session_at_choice(catalog).await;
    session.handle_input("sì").await.unwrap();
    for _ in 1..number {
        session.handle_input("1").await.unwrap();
    }
    session
}
