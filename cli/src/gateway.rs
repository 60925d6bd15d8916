//! HTTP implementation of the catalog gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use riskflow_core::{
    AssessmentField, CatalogGateway, DescriptionPayload, Event, GatewayError, RawEvent,
    ScoreResult,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::util::client;

#[derive(Deserialize)]
struct CategoriesResponse {
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Deserialize)]
struct FieldsResponse {
    #[serde(default)]
    fields: Vec<AssessmentField>,
}

pub struct HttpCatalog {
    base: Url,
    client: reqwest::Client,
}

impl HttpCatalog {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base =
            Url::parse(api_url).map_err(|e| GatewayError::InvalidUrl(format!("{api_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(api_url.to_string()));
        }
        let client = client(timeout).map_err(transport)?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<T, GatewayError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%method, %url, "catalog request");

        let mut req = self.client.request(method, url);
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req.send().await.map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("unreadable body: {e}"));
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message,
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Unparsed response of a GET, for printing.
    pub async fn raw(&self, segments: &[&str]) -> Result<Value, GatewayError> {
        self.request(Method::GET, segments, None).await
    }
}

fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

#[async_trait]
impl CatalogGateway for HttpCatalog {
    async fn categories(&self) -> Result<Vec<String>, GatewayError> {
        let resp: CategoriesResponse = self.request(Method::GET, &["categories"], None).await?;
        Ok(resp.categories)
    }

    async fn events(&self, category_key: &str) -> Result<Vec<Event>, GatewayError> {
        let resp: EventsResponse = self
            .request(Method::GET, &["events", category_key], None)
            .await?;
        Ok(resp.events.into_iter().map(Event::from).collect())
    }

    async fn description(&self, event_code: &str) -> Result<DescriptionPayload, GatewayError> {
        self.request(Method::GET, &["description", event_code], None)
            .await
    }

    async fn assessment_fields(&self) -> Result<Vec<AssessmentField>, GatewayError> {
        let resp: FieldsResponse = self
            .request(Method::GET, &["risk-assessment-fields"], None)
            .await?;
        Ok(resp.fields)
    }

    async fn submit_assessment(&self, body: &Value) -> Result<ScoreResult, GatewayError> {
        self.request(Method::POST, &["save-risk-assessment"], Some(body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn catalog(server: &MockServer) -> HttpCatalog {
        HttpCatalog::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn rejects_unparsable_base_url() {
        let err = HttpCatalog::new("not a url", Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, GatewayError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn events_accept_objects_and_bracketed_strings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events/Clients_product_Clienti"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [
                    {"code": "501", "name": "Vendita scorretta"},
                    "**[505]** Violazione privacy"
                ]
            })))
            .mount(&server)
            .await;

        let events = catalog(&server)
            .events("Clients_product_Clienti")
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].code, "505");
        assert_eq!(events[1].name, "Violazione privacy");
    }

    #[tokio::test]
    async fn error_status_becomes_gateway_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/description/505"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = catalog(&server).description("505").await.unwrap_err();
        match err {
            GatewayError::Status { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn non_json_success_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/risk-assessment-fields"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = catalog(&server).assessment_fields().await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[tokio::test]
    async fn fields_keep_readonly_entries_for_the_session_to_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/risk-assessment-fields"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fields": [
                    {"id": "controllo", "question": "Controlli?", "type": "select",
                     "options": [{"value": "++", "label": "Adeguato", "emoji": "🟢"}, "--"]},
                    {"id": "descrizione_controllo", "question": "Descrizione", "type": "readonly"}
                ]
            })))
            .mount(&server)
            .await;

        let fields = catalog(&server).assessment_fields().await.unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields[0].is_interactive());
        assert!(!fields[1].is_interactive());
        assert_eq!(fields[0].option_labels(), vec!["🟢 Adeguato", "--"]);
    }

    #[tokio::test]
    async fn submission_posts_the_answer_body() {
        let server = MockServer::start().await;
        let body = json!({"eventCode": "505", "category": "Clients_product_Clienti", "controllo": "--"});
        Mock::given(method("POST"))
            .and(path("/save-risk-assessment"))
            .and(body_json(body.clone()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"risk_score": 68.5, "analysis": "Rischio alto"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let score = catalog(&server).submit_assessment(&body).await.unwrap();
        assert_eq!(score.risk_score, 68.5);
        assert_eq!(score.analysis.as_deref(), Some("Rischio alto"));
    }

    #[tokio::test]
    async fn connection_failure_is_transport() {
        let gateway = HttpCatalog::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let err = gateway.categories().await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }
}
