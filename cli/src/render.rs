//! Plain-text rendering of transcript cards for the terminal.

use std::fmt::Write;

use riskflow_core::{Card, Step};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━";

pub fn card(card: &Card) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_card(&mut out, card);
    out.trim_end().to_string()
}

fn write_card(out: &mut String, card: &Card) -> std::fmt::Result {
    match card {
        Card::UserReply { text } => writeln!(out, "> {text}"),
        Card::Prompt { text } => writeln!(out, "{text}"),
        Card::CategoriesList { categories } => {
            writeln!(out, "📋 Categorie di rischio disponibili:")?;
            for category in categories {
                writeln!(out, "  • {} (scrivi \"{}\")", category.name, category.keyword)?;
            }
            writeln!(out, "Scrivi il nome della categoria da analizzare.")
        }
        Card::EventsList {
            category_name,
            events,
            ..
        } => {
            writeln!(out, "📂 {category_name}: {} eventi", events.len())?;
            for (i, event) in events.iter().enumerate() {
                writeln!(out, "  {:>2}. [{}] {}", i + 1, event.code, event.name)?;
            }
            writeln!(
                out,
                "Scrivi il numero (1-{}) o il codice dell'evento.",
                events.len()
            )
        }
        Card::EventDescription(d) => {
            writeln!(out, "{RULE}")?;
            writeln!(out, "📌 [{}] {}", d.event_code, d.name)?;
            writeln!(out, "{}", d.description)?;
            writeln!(out, "  Gravità: {}", d.severity)?;
            writeln!(out, "  Probabilità: {}", d.probability)?;
            writeln!(out, "  Impatto: {}", d.impact)?;
            writeln!(out, "  Controlli: {}", d.controls)?;
            writeln!(out, "  Monitoraggio: {}", d.monitoring)?;
            writeln!(out, "{RULE}")
        }
        Card::AssessmentQuestion {
            number,
            total,
            question,
            options,
            ..
        } => {
            writeln!(out, "Domanda {number} di {total}: {question}")?;
            for (i, option) in options.iter().enumerate() {
                writeln!(out, "  {}. {option}", i + 1)?;
            }
            Ok(())
        }
        Card::ControlDescription { title, description } => {
            writeln!(out, "✓ {title}")?;
            writeln!(out, "{description}")
        }
        Card::AssessmentComplete {
            risk_score,
            risk_level,
            analysis,
        } => {
            writeln!(out, "✅ VALUTAZIONE COMPLETATA")?;
            writeln!(out, "{RULE}")?;
            writeln!(out, "📊 Risk Score: {risk_score}/100 ({})", risk_level.label())?;
            if let Some(analysis) = analysis {
                writeln!(out, "📈 {analysis}")?;
            }
            writeln!(out, "{RULE}")
        }
        Card::Error(notice) => {
            writeln!(out, "{}", notice.message)?;
            if let Some(hint) = &notice.docs_hint {
                writeln!(out, "   {hint}")?;
            }
            Ok(())
        }
    }
}

/// One-line status header: progress bar plus step name.
pub fn progress(step: Step) -> String {
    let (current, total) = step.progress();
    format!(
        "[{}{}] {current}/{total} {step}",
        "■".repeat(current),
        "□".repeat(total - current)
    )
}

#[cfg(test)]
mod tests {
    use riskflow_core::{CategoryItem, Category, ErrorNotice, Event, RiskLevel};

    use super::*;

    #[test]
    fn question_lists_numbered_options() {
        let text = card(&Card::AssessmentQuestion {
            number: 6,
            total: 7,
            field_id: "controllo".to_string(),
            question: "Controlli adeguati?".to_string(),
            options: vec!["🟢 Adeguato".to_string(), "🔴 Non adeguato / assente".to_string()],
        });
        assert_eq!(
            text,
            "Domanda 6 di 7: Controlli adeguati?\n  1. 🟢 Adeguato\n  2. 🔴 Non adeguato / assente"
        );
    }

    #[test]
    fn events_list_shows_range_hint() {
        let text = card(&Card::EventsList {
            category_key: "Clients_product_Clienti".to_string(),
            category_name: "Rischi con clienti e prodotti".to_string(),
            events: vec![Event {
                code: "505".to_string(),
                name: "Violazione privacy".to_string(),
            }],
        });
        assert!(text.contains("   1. [505] Violazione privacy"));
        assert!(text.ends_with("(1-1) o il codice dell'evento."));
    }

    #[test]
    fn categories_list_mentions_keywords() {
        let text = card(&Card::CategoriesList {
            categories: vec![CategoryItem::from(Category::ExternalFraud)],
        });
        assert!(text.contains("Frodi esterne (scrivi \"frodi esterne\")"));
    }

    #[test]
    fn completion_and_error_cards() {
        let done = card(&Card::AssessmentComplete {
            risk_score: 80.0,
            risk_level: RiskLevel::Critical,
            analysis: None,
        });
        assert!(done.contains("Risk Score: 80/100 (Critical)"));

        let err = card(&Card::Error(
            ErrorNotice::new("gateway_unavailable", "❌ Errore").with_hint("Riprova"),
        ));
        assert_eq!(err, "❌ Errore\n   Riprova");
    }

    #[test]
    fn progress_bar_fills_by_step() {
        assert_eq!(
            progress(Step::question(1, 7)),
            "[■■■■□□□□□□] 4/10 assessment_q1"
        );
    }
}
