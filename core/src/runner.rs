//! The question battery: answer recording, the control side effect, and scoring.

use crate::answers::{
    CONTROL_DESCRIPTION_FIELD_ID, CONTROL_FIELD_ID, RiskLevel, control_summary, describe_control,
};
use crate::catalog::CatalogGateway;
use crate::error::{ErrorNotice, FlowError, TransitionError, codes};
use crate::input::{self, Reply};
use crate::session::{Outcome, Session};
use crate::step::{Step, StepKind};
use crate::transcript::{Card, TranscriptSink};

const RETRY_WORDS: [&str; 2] = ["riprova", "retry"];
const COMPLETED_HELP: &str = "Scrivi \"report\" per il riepilogo, \"altro\" per valutare un altro evento della stessa categoria, \"cambia\" per cambiare categoria o \"fine\" per terminare.";

impl<G: CatalogGateway, T: TranscriptSink> Session<G, T> {
    /// Assessment(n): record the chosen option and move to the next question,
    /// or score the answer set after the last one.
    pub async fn answer(&mut self, text: &str) -> Result<Outcome, FlowError> {
        let step = self.register.step();
        let Some((index, total)) = step.question_position() else {
            return self.expect_kind(StepKind::Assessment).map(|_| Outcome::Stayed);
        };
        let Some(field) = index
            .checked_sub(1)
            .and_then(|i| self.register.fields().get(i))
            .cloned()
        else {
            tracing::error!(step = %step, fields = self.register.fields().len(), "no field for current question");
            return Err(TransitionError::Malformed(step).into());
        };

        let Some(choice) = input::parse_option_index(text, field.options.len()) else {
            return Err(self.reprompt(
                format!(
                    "❓ Risposta non valida. Scrivi un numero da 1 a {} (domanda {index} di {total}).",
                    field.options.len()
                ),
                "option index out of range",
            ));
        };

        let next = if index < total {
            Step::question(index + 1, total)
        } else {
            Step::AssessmentComplete
        };
        self.ensure(next)?;

        let value = field.options[choice].value();
        tracing::debug!(field = %field.id, value = %value, "answer recorded");
        self.register.answers.record(field.id.as_str(), value.as_str());

        if field.id == CONTROL_FIELD_ID {
            self.register
                .answers
                .record(CONTROL_DESCRIPTION_FIELD_ID, control_summary(&value));
            if let Some(control) = describe_control(&value) {
                self.transcript.append(Card::ControlDescription {
                    title: control.title.to_string(),
                    description: control.description.to_string(),
                });
            }
        }

        if index < total {
            self.register.lock.touch();
            let outcome = self.move_to(next)?;
            self.emit_question(index + 1);
            Ok(outcome)
        } else {
            self.move_to(next)?;
            self.submit().await
        }
    }

    /// AssessmentComplete: only reachable here after a failed submission.
    /// Retry resubmits the stored answers; "annulla" or "no" abandons them.
    pub async fn retry_submission(&mut self, text: &str) -> Result<Outcome, FlowError> {
        self.expect_kind(StepKind::AssessmentComplete)?;
        if input::mentions(text, &RETRY_WORDS) {
            tracing::info!("retrying score submission");
            return self.submit().await;
        }
        match input::classify_reply(text) {
            Reply::Yes => {
                tracing::info!("retrying score submission");
                self.submit().await
            }
            Reply::No => {
                self.ensure(Step::Idle)?;
                self.cancel();
                Ok(Outcome::Moved {
                    from: Step::AssessmentComplete,
                    to: Step::Idle,
                })
            }
            Reply::Other => Err(self.reprompt(
                "Scrivi \"riprova\" per inviare di nuovo le risposte, oppure \"annulla\" per abbandonare la valutazione.",
                "expected retry",
            )),
        }
    }

    /// Completed: report, another event, another category, or goodbye.
    pub fn after_completion(&mut self, text: &str) -> Result<Outcome, FlowError> {
        self.expect_kind(StepKind::Completed)?;
        if input::mentions(text, &["report"]) {
            return Ok(Outcome::ReportRequested);
        }
        if input::mentions(text, &["altro"]) {
            let outcome = self.move_to(Step::WaitingEvent)?;
            self.emit_events();
            return Ok(outcome);
        }
        if input::mentions(text, &["cambia"]) {
            let outcome = self.move_to(Step::WaitingCategory)?;
            self.emit_categories();
            return Ok(outcome);
        }
        if input::mentions(text, &["fine"]) {
            self.ensure(Step::Idle)?;
            self.transcript.append(Card::prompt(
                "Grazie per aver utilizzato il sistema di valutazione rischi. Scrivi \"rischi\" per iniziare una nuova valutazione.",
            ));
            self.register.reset();
            return Ok(Outcome::Moved {
                from: Step::Completed,
                to: Step::Idle,
            });
        }
        self.transcript.append(Card::prompt(COMPLETED_HELP));
        Ok(Outcome::Stayed)
    }

    /// Post the stored answers for scoring. The lock is released whatever the result.
    pub(crate) async fn submit(&mut self) -> Result<Outcome, FlowError> {
        let (event_code, category) = self
            .register
            .assessed()
            .map(|a| (a.event_code.clone(), a.category.clone()))
            .unwrap_or_default();
        let body = self.register.answers().submission_body(&event_code, &category);
        tracing::info!(
            event_code = %event_code,
            category = %category,
            answers = self.register.answers().len(),
            "submitting assessment for scoring"
        );

        let result = self.gateway.submit_assessment(&body).await;
        self.register.lock.release();

        match result {
            Ok(score) => {
                let outcome = self.move_to(Step::Completed)?;
                let risk_level = RiskLevel::from_score(score.risk_score);
                tracing::info!(
                    event_code = %event_code,
                    risk_score = score.risk_score,
                    risk_level = risk_level.label(),
                    "assessment scored"
                );
                self.transcript.append(Card::AssessmentComplete {
                    risk_score: score.risk_score,
                    risk_level,
                    analysis: score.analysis,
                });
                self.transcript.append(Card::prompt(COMPLETED_HELP));
                Ok(outcome)
            }
            Err(err) => {
                tracing::warn!(error = %err, event_code = %event_code, "score submission failed");
                self.transcript.append(Card::Error(
                    ErrorNotice::new(
                        codes::SCORE_SUBMISSION_FAILED,
                        "❌ Errore nel salvataggio della valutazione",
                    )
                    .with_hint("Scrivi \"riprova\" per inviare di nuovo le risposte."),
                ));
                Err(FlowError::ScoreSubmission(err))
            }
        }
    }
}
