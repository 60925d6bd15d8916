//! Prompt cards the session emits, and the sink they are written to.
//!
//! The sink is append-only from the session's point of view, except for two
//! targeted prunes: dropping stale event descriptions when the user switches
//! event, and rewinding to a previous question on back-navigation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::answers::RiskLevel;
use crate::catalog::{Category, Event, EventDescription};
use crate::error::ErrorNotice;

/// Category entry as listed on the categories card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryItem {
    pub key: String,
    pub name: String,
    pub keyword: String,
}

impl From<Category> for CategoryItem {
    fn from(category: Category) -> Self {
        Self {
            key: category.backend_key().to_string(),
            name: category.display_name().to_string(),
            keyword: category.keyword().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Card {
    /// What the user typed
    UserReply { text: String },
    /// Plain agent text: confirmations, re-prompts, help
    Prompt { text: String },
    CategoriesList { categories: Vec<CategoryItem> },
    EventsList {
        category_key: String,
        category_name: String,
        events: Vec<Event>,
    },
    EventDescription(EventDescription),
    AssessmentQuestion {
        number: usize,
        total: usize,
        field_id: String,
        question: String,
        options: Vec<String>,
    },
    ControlDescription { title: String, description: String },
    AssessmentComplete {
        risk_score: f64,
        risk_level: RiskLevel,
        #[serde(skip_serializing_if = "Option::is_none")]
        analysis: Option<String>,
    },
    Error(ErrorNotice),
}

impl Card {
    pub fn prompt(text: impl Into<String>) -> Self {
        Card::Prompt { text: text.into() }
    }

    pub fn is_from_user(&self) -> bool {
        matches!(self, Card::UserReply { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub card: Card,
}

impl TranscriptEntry {
    pub fn new(card: Card) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            card,
        }
    }
}

/// Where the session writes its cards.
pub trait TranscriptSink: Send {
    fn append(&mut self, card: Card);

    /// Drop every event-description and control-description card.
    /// Returns how many entries were removed.
    fn prune_descriptions(&mut self) -> usize;

    /// Remove everything after the most recent question card for `number`.
    /// Returns how many entries were removed; 0 if no such card exists.
    fn rewind_to_question(&mut self, number: usize) -> usize;
}

/// In-memory transcript.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Card> {
        self.entries.last().map(|e| &e.card)
    }

    /// Entries after the one with id `last`, all of them for `None`.
    ///
    /// Pruning can remove cards anywhere, so position is tracked by id. When
    /// `last` itself is gone (back-navigation) only the new last entry is returned.
    pub fn after(&self, last: Option<Uuid>) -> &[TranscriptEntry] {
        let Some(last) = last else {
            return &self.entries;
        };
        match self.entries.iter().rposition(|e| e.id == last) {
            Some(idx) => &self.entries[idx + 1..],
            None => &self.entries[self.entries.len().saturating_sub(1)..],
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl TranscriptSink for Transcript {
    fn append(&mut self, card: Card) {
        self.entries.push(TranscriptEntry::new(card));
    }

    fn prune_descriptions(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| {
            !matches!(
                e.card,
                Card::EventDescription(_) | Card::ControlDescription { .. }
            )
        });
        before - self.entries.len()
    }

    fn rewind_to_question(&mut self, number: usize) -> usize {
        let anchor = self.entries.iter().rposition(|e| {
            matches!(e.card, Card::AssessmentQuestion { number: n, .. } if n == number)
        });
        match anchor {
            Some(idx) => {
                let removed = self.entries.len() - (idx + 1);
                self.entries.truncate(idx + 1);
                removed
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(number: usize) -> Card {
        Card::AssessmentQuestion {
            number,
            total: 7,
            field_id: format!("f{number}"),
            question: format!("Q{number}?"),
            options: vec!["a".to_string(), "b".to_string()],
        }
    }

    #[test]
    fn rewind_keeps_target_question_and_drops_the_rest() {
        let mut transcript = Transcript::new();
        transcript.append(question(1));
        transcript.append(Card::UserReply {
            text: "1".to_string(),
        });
        transcript.append(question(2));

        let removed = transcript.rewind_to_question(1);
        assert_eq!(removed, 2);
        assert_eq!(transcript.last(), Some(&question(1)));
    }

    #[test]
    fn rewind_without_anchor_is_a_no_op() {
        let mut transcript = Transcript::new();
        transcript.append(Card::prompt("hi"));
        assert_eq!(transcript.rewind_to_question(3), 0);
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn prune_only_touches_description_cards() {
        let mut transcript = Transcript::new();
        transcript.append(Card::prompt("hi"));
        transcript.append(Card::ControlDescription {
            title: "t".to_string(),
            description: "d".to_string(),
        });
        assert_eq!(transcript.prune_descriptions(), 1);
        assert_eq!(transcript.len(), 1);
    }

    fn description(code: &str) -> Card {
        Card::EventDescription(EventDescription {
            event_code: code.to_string(),
            name: format!("Evento {code}"),
            category: "Clients_product_Clienti".to_string(),
            severity: "Media".to_string(),
            description: "d".to_string(),
            probability: "Media".to_string(),
            impact: "Medio".to_string(),
            controls: "Standard".to_string(),
            monitoring: "Trimestrale".to_string(),
        })
    }

    #[test]
    fn after_survives_pruning_earlier_cards() {
        let mut transcript = Transcript::new();
        transcript.append(description("505"));
        transcript.append(description("505"));
        transcript.append(Card::prompt("Vuoi cambiare evento?"));
        let last = transcript.entries().last().map(|e| e.id);

        transcript.append(Card::UserReply {
            text: "sì".to_string(),
        });
        transcript.prune_descriptions();
        transcript.append(description("501"));
        transcript.append(Card::prompt("Vuoi procedere?"));

        let fresh: Vec<&Card> = transcript.after(last).iter().map(|e| &e.card).collect();
        assert_eq!(fresh.len(), 3);
        assert_eq!(fresh[1], &description("501"));
        assert!(transcript.after(transcript.entries().last().map(|e| e.id)).is_empty());
    }

    #[test]
    fn after_falls_back_to_last_entry_when_anchor_was_removed() {
        let mut transcript = Transcript::new();
        transcript.append(question(1));
        transcript.append(Card::UserReply {
            text: "1".to_string(),
        });
        transcript.append(question(2));
        let last = transcript.entries().last().map(|e| e.id);

        transcript.rewind_to_question(1);
        let fresh = transcript.after(last);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].card, question(1));
        assert_eq!(transcript.after(None).len(), 1);
    }

    #[test]
    fn cards_serialise_with_kebab_case_tags() {
        let entry = TranscriptEntry::new(Card::prompt("ciao"));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "prompt");
        assert_eq!(json["text"], "ciao");
    }
}
