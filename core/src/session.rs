//! One interview session: routes each user input to the handler for the current
//! step, and owns the register, the transcript and the gateway handle.
//!
//! Inputs are processed one at a time. A handler that needs the catalog performs
//! exactly one call and applies no transition until it has settled.

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::catalog::{CatalogGateway, Category, Event, EventDescription};
use crate::config::SessionConfig;
use crate::error::{ErrorNotice, FlowError, GatewayError, TransitionError, codes};
use crate::guard::GuardDecision;
use crate::input::{self, Reply};
use crate::lock::{InactivityExpired, ProcessLock};
use crate::register::{AssessedEvent, StateRegister};
use crate::step::{Step, StepKind};
use crate::transcript::{Card, CategoryItem, TranscriptSink};

const START_KEYWORDS: [&str; 2] = ["risk", "rischi"];
const BACK_WORDS: [&str; 2] = ["indietro", "back"];

/// Result of one handled input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Moved { from: Step, to: Step },
    /// Input accepted but the step did not change
    Stayed,
    /// The user asked to see the report of the completed assessment
    ReportRequested,
}

pub struct Session<G, T> {
    pub(crate) gateway: G,
    pub(crate) transcript: T,
    pub(crate) register: StateRegister,
}

impl<G: CatalogGateway, T: TranscriptSink> Session<G, T> {
    pub fn new(gateway: G, transcript: T, config: SessionConfig) -> Self {
        Self {
            gateway,
            transcript,
            register: StateRegister::new(ProcessLock::new(config.inactivity_timeout)),
        }
    }

    /// Receiver for inactivity expiries. Feed each one back through
    /// [`Session::handle_inactivity`].
    pub fn inactivity_events(&mut self) -> mpsc::UnboundedReceiver<InactivityExpired> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.register.lock.set_notifier(tx);
        rx
    }

    pub fn register(&self) -> &StateRegister {
        &self.register
    }

    pub fn step(&self) -> Step {
        self.register.step()
    }

    pub fn transcript(&self) -> &T {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut T {
        &mut self.transcript
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn is_locked(&self) -> bool {
        self.register.lock().is_locked()
    }

    /// Route one user utterance to the handler for the current step.
    pub async fn handle_input(&mut self, text: &str) -> Result<Outcome, FlowError> {
        self.expire_if_stale(Instant::now());

        let text = text.trim();
        if !text.is_empty() {
            self.transcript.append(Card::UserReply {
                text: text.to_string(),
            });
        }

        match self.register.step().kind() {
            StepKind::Idle => self.start(text),
            StepKind::WaitingCategory => self.select_category(text).await,
            StepKind::WaitingEvent => self.select_event(text).await,
            StepKind::WaitingEventChangeConfirmation => self.confirm_event_change(text).await,
            StepKind::WaitingChoice => self.choose(text).await,
            StepKind::Assessment => self.answer(text).await,
            StepKind::AssessmentComplete => self.retry_submission(text).await,
            StepKind::Completed => self.after_completion(text),
        }
    }

    /// Idle: open the flow when the user asks about risks.
    pub fn start(&mut self, text: &str) -> Result<Outcome, FlowError> {
        self.expect_kind(StepKind::Idle)?;
        let lowered = text.to_lowercase();
        if !START_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            return Ok(Outcome::Stayed);
        }
        let outcome = self.move_to(Step::WaitingCategory)?;
        self.emit_categories();
        Ok(outcome)
    }

    /// WaitingCategory: resolve a keyword and load that category's events.
    pub async fn select_category(&mut self, text: &str) -> Result<Outcome, FlowError> {
        self.expect_kind(StepKind::WaitingCategory)?;
        let Some(category) = Category::resolve(text) else {
            let keywords: Vec<&str> = Category::ALL.iter().map(Category::keyword).collect();
            return Err(self.reprompt(
                format!("❓ Scrivi una categoria valida: {}", keywords.join(", ")),
                "unknown category",
            ));
        };
        self.ensure(Step::WaitingEvent)?;

        let events = match self.gateway.events(category.backend_key()).await {
            Ok(events) => events,
            Err(err) => {
                return Err(self.gateway_failure(
                    err,
                    "❌ Errore nel caricamento eventi. Verifica che il backend sia attivo.",
                ));
            }
        };

        let outcome = self.move_to(Step::WaitingEvent)?;
        tracing::info!(
            category = category.backend_key(),
            events = events.len(),
            "category selected"
        );
        self.register.set_category(category, events);
        self.emit_events();
        Ok(outcome)
    }

    /// WaitingEvent: resolve a pick and either describe it or ask to confirm a change.
    pub async fn select_event(&mut self, text: &str) -> Result<Outcome, FlowError> {
        self.expect_kind(StepKind::WaitingEvent)?;
        if input::mentions(text, &BACK_WORDS) {
            let outcome = self.move_to(Step::WaitingCategory)?;
            self.emit_categories();
            return Ok(outcome);
        }

        let Some(candidate) = input::resolve_event(text, self.register.events()).cloned() else {
            let count = self.register.events().len();
            return Err(self.reprompt(
                format!(
                    "❓ Non trovato. Scrivi un numero da 1 a {count} o un codice evento (es: 505)"
                ),
                "unknown event",
            ));
        };

        match self.register.guard().decide(&candidate) {
            GuardDecision::ConfirmChange => {
                let outcome = self.move_to(Step::WaitingEventChangeConfirmation)?;
                let current = self
                    .register
                    .guard()
                    .selected()
                    .map(|e| e.code.clone())
                    .unwrap_or_default();
                tracing::info!(
                    current = %current,
                    candidate = %candidate.code,
                    "event change needs confirmation"
                );
                self.transcript.append(Card::prompt(format!(
                    "Hai già selezionato l'evento {current}. Vuoi passare all'evento {} - {}? (sì/no)",
                    candidate.code, candidate.name
                )));
                self.register.guard.stage(candidate);
                Ok(outcome)
            }
            GuardDecision::Proceed | GuardDecision::Reselect => self.describe_event(candidate).await,
        }
    }

    /// WaitingEventChangeConfirmation: yes switches event, no keeps the old one.
    pub async fn confirm_event_change(&mut self, text: &str) -> Result<Outcome, FlowError> {
        self.expect_kind(StepKind::WaitingEventChangeConfirmation)?;
        match input::classify_reply(text) {
            Reply::Yes => {
                let Some(candidate) = self.register.guard().pending().cloned() else {
                    tracing::error!("confirmation step without a pending event");
                    return Err(TransitionError::Malformed(self.register.step()).into());
                };
                self.ensure(Step::WaitingChoice)?;
                let payload = match self.gateway.description(&candidate.code).await {
                    Ok(payload) => payload,
                    Err(err) => {
                        return Err(self.gateway_failure(
                            err,
                            "❌ Errore nel caricamento della descrizione",
                        ));
                    }
                };
                let pruned = self.transcript.prune_descriptions();
                tracing::debug!(pruned, "stale description cards removed");
                self.register.guard.accept();
                self.apply_description(candidate, payload)
            }
            Reply::No => {
                let outcome = self.move_to(Step::WaitingEvent)?;
                self.register.guard.decline();
                let kept = self
                    .register
                    .guard()
                    .selected()
                    .map(|e| e.code.clone())
                    .unwrap_or_default();
                self.transcript.append(Card::prompt(format!(
                    "Ok, manteniamo l'evento {kept}. Scegli un altro evento o riprendi da dove eri."
                )));
                Ok(outcome)
            }
            Reply::Other => Err(self.reprompt(
                "Rispondi sì per cambiare evento o no per mantenere quello attuale.",
                "expected yes or no",
            )),
        }
    }

    /// WaitingChoice: yes starts the battery, no goes back to the event list.
    pub async fn choose(&mut self, text: &str) -> Result<Outcome, FlowError> {
        self.expect_kind(StepKind::WaitingChoice)?;
        match input::classify_reply(text) {
            Reply::Yes => self.begin_assessment().await,
            Reply::No => {
                let outcome = self.move_to(Step::WaitingEvent)?;
                self.emit_events();
                Ok(outcome)
            }
            Reply::Other => Err(self.reprompt(
                "Vuoi procedere con la valutazione completa? Rispondi sì o no.",
                "expected yes or no",
            )),
        }
    }

    /// Undo the last answered question. Only legal from the second question on.
    ///
    /// Returns whether the session moved; never fails loudly.
    pub fn go_back(&mut self) -> bool {
        let Some((index, total)) = self.register.step().question_position() else {
            tracing::debug!(step = %self.register.step(), "back-navigation outside the battery");
            return false;
        };
        if index < 2 || self.register.history().is_empty() {
            return false;
        }
        let target = Step::question(index - 1, total);
        if !crate::transitions::allowed(self.register.step(), target) {
            return false;
        }
        match self.register.retreat(target) {
            Ok(_) => {
                let removed = self.transcript.rewind_to_question(index - 1);
                self.register.lock.touch();
                tracing::info!(to = %target, removed, "went back one question");
                true
            }
            Err(err) => {
                tracing::debug!(error = %err, "back-navigation refused");
                false
            }
        }
    }

    /// User-confirmed abort of whatever is in progress.
    pub fn cancel(&mut self) {
        let from = self.register.step();
        self.register.reset();
        tracing::info!(from = %from, "flow cancelled");
        if from != Step::Idle {
            self.transcript
                .append(Card::prompt("Valutazione annullata. Scrivi \"rischi\" per ricominciare."));
        }
    }

    /// New conversation: drop all state without emitting anything.
    pub fn reset(&mut self) {
        self.register.reset();
        tracing::info!("session reset");
    }

    /// Apply an inactivity expiry. Stale expiries (superseded or released timers)
    /// are ignored. Returns whether the session was reset.
    pub fn handle_inactivity(&mut self, expiry: InactivityExpired) -> bool {
        if !self.register.lock().is_current(expiry) {
            tracing::debug!("stale inactivity expiry ignored");
            return false;
        }
        self.fail_safe_reset();
        true
    }

    /// Poll the lock deadline; covers sessions driven without a notifier.
    pub fn expire_if_stale(&mut self, now: Instant) -> bool {
        if self.register.lock().is_expired(now) {
            self.fail_safe_reset();
            true
        } else {
            false
        }
    }

    fn fail_safe_reset(&mut self) {
        tracing::warn!(step = %self.register.step(), "inactivity window elapsed; session reset");
        self.register.reset();
    }

    async fn begin_assessment(&mut self) -> Result<Outcome, FlowError> {
        if self.register.lock().is_locked() {
            tracing::warn!("assessment start rejected: lock already held");
            self.transcript.append(Card::Error(
                ErrorNotice::new(codes::LOCK_CONTENTION, "⚠️ Una valutazione è già in corso.")
                    .with_hint("Completa o annulla la valutazione attuale prima di iniziarne un'altra."),
            ));
            return Err(FlowError::LockContention);
        }
        self.ensure(Step::question(1, 1))?;

        let fields = match self.gateway.assessment_fields().await {
            Ok(fields) => fields,
            Err(err) => {
                return Err(self.gateway_failure(
                    err,
                    "❌ Errore nel caricamento delle domande di valutazione",
                ));
            }
        };
        let fields: Vec<_> = fields.into_iter().filter(|f| f.is_interactive()).collect();
        if fields.is_empty() {
            return Err(self.gateway_failure(
                GatewayError::Decode("no interactive assessment fields declared".to_string()),
                "❌ Nessuna domanda di valutazione disponibile",
            ));
        }

        let total = fields.len();
        let outcome = self.move_to(Step::question(1, total))?;
        self.register.lock.acquire();
        self.register.set_fields(fields);
        self.emit_question(1);
        Ok(outcome)
    }

    async fn describe_event(&mut self, event: Event) -> Result<Outcome, FlowError> {
        self.ensure(Step::WaitingChoice)?;
        match self.gateway.description(&event.code).await {
            Ok(payload) => self.apply_description(event, payload),
            Err(err) => Err(self.gateway_failure(
                err,
                "❌ Errore nel caricamento della descrizione",
            )),
        }
    }

    fn apply_description(
        &mut self,
        event: Event,
        payload: crate::catalog::DescriptionPayload,
    ) -> Result<Outcome, FlowError> {
        let category = self
            .register
            .category()
            .map(|c| c.backend_key().to_string())
            .unwrap_or_default();
        let outcome = self.move_to(Step::WaitingChoice)?;
        let description = EventDescription::from_payload(&event.code, &category, payload);
        tracing::info!(event_code = %event.code, category = %category, "event selected");
        self.register.set_assessed(AssessedEvent {
            event_code: event.code.clone(),
            category,
        });
        self.register.guard.commit(event);
        self.transcript.append(Card::EventDescription(description));
        self.transcript.append(Card::prompt(
            "Vuoi procedere con la valutazione completa di questo rischio? (sì/no)",
        ));
        Ok(outcome)
    }

    pub(crate) fn expect_kind(&self, kind: StepKind) -> Result<(), FlowError> {
        let step = self.register.step();
        if step.kind() == kind {
            return Ok(());
        }
        tracing::error!(step = %step, expected = ?kind, "handler invoked from unexpected step");
        Err(TransitionError::Denied {
            from: step,
            to: step,
        }
        .into())
    }

    pub(crate) fn ensure(&self, to: Step) -> Result<(), FlowError> {
        self.register.ensure(to).map_err(|err| {
            tracing::error!(error = %err, "transition rejected by table");
            FlowError::from(err)
        })
    }

    pub(crate) fn move_to(&mut self, to: Step) -> Result<Outcome, FlowError> {
        match self.register.advance(to) {
            Ok(from) => Ok(Outcome::Moved { from, to }),
            Err(err) => {
                tracing::error!(error = %err, "transition rejected by table");
                Err(err.into())
            }
        }
    }

    pub(crate) fn reprompt(&mut self, text: impl Into<String>, reason: &str) -> FlowError {
        let step = self.register.step();
        tracing::debug!(step = %step, reason, "input not recognised");
        self.transcript.append(Card::prompt(text));
        FlowError::UserInput {
            step,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn gateway_failure(&mut self, err: GatewayError, message: &str) -> FlowError {
        tracing::warn!(error = %err, step = %self.register.step(), "catalog call failed");
        self.transcript.append(Card::Error(
            ErrorNotice::new(codes::GATEWAY_UNAVAILABLE, message)
                .with_hint("Riprova inviando di nuovo la stessa risposta."),
        ));
        FlowError::GatewayUnavailable(err)
    }

    pub(crate) fn emit_categories(&mut self) {
        let categories = Category::ALL.into_iter().map(CategoryItem::from).collect();
        self.transcript.append(Card::CategoriesList { categories });
    }

    pub(crate) fn emit_events(&mut self) {
        let (category_key, category_name) = self
            .register
            .category()
            .map(|c| (c.backend_key().to_string(), c.display_name().to_string()))
            .unwrap_or_default();
        self.transcript.append(Card::EventsList {
            category_key,
            category_name,
            events: self.register.events().to_vec(),
        });
    }

    pub(crate) fn emit_question(&mut self, number: usize) {
        let total = self.register.fields().len();
        let Some(field) = number.checked_sub(1).and_then(|i| self.register.fields().get(i)) else {
            tracing::error!(number, total, "no field for question");
            return;
        };
        let card = Card::AssessmentQuestion {
            number,
            total,
            field_id: field.id.clone(),
            question: field.question.clone(),
            options: field.option_labels(),
        };
        self.transcript.append(card);
    }
}
