use std::fmt;

use serde::{Deserialize, Serialize};

/// Pre-trip transport-condition questions, in the order the backend expects
/// them in the checklist body.
pub const CONDITION_KEYS: [&str; 10] = [
    "temperatura_controlada",
    "embalaje_adecuado",
    "carga_segura",
    "vehiculo_limpio",
    "documentos_presentes",
    "ruta_conocida",
    "combustible_completo",
    "gps_operativo",
    "comunicacion_funcional",
    "estado_general_aceptable",
];

/// Post-trip incident questions.
pub const INCIDENT_KEYS: [&str; 10] = [
    "retraso",
    "problema_mecanico",
    "accidente",
    "perdida_carga",
    "condiciones_climaticas_adversas",
    "ruta_alternativa_usada",
    "contacto_cliente_dificultoso",
    "parada_imprevista",
    "problemas_documentacion",
    "otros_incidentes",
];

/// Which of the two inspection checklists an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChecklistKind {
    /// Pre-trip conditions checklist, gating the start of a trip
    Conditions,
    /// Post-trip incidents checklist, gating finalization
    Incidents,
}

impl ChecklistKind {
    pub fn question_keys(&self) -> &'static [&'static str] {
        match self {
            ChecklistKind::Conditions => &CONDITION_KEYS,
            ChecklistKind::Incidents => &INCIDENT_KEYS,
        }
    }
}

impl fmt::Display for ChecklistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecklistKind::Conditions => f.write_str("conditions"),
            ChecklistKind::Incidents => f.write_str("incidents"),
        }
    }
}

/// Tri-state answer to one checklist question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Answer {
    Unanswered,
    Yes,
    No,
}

impl Answer {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Answer::Unanswered => None,
            Answer::Yes => Some(true),
            Answer::No => Some(false),
        }
    }
}

/// Answer sheet for one checklist: the fixed question keys mapped to
/// tri-state answers, plus a free-text note.
///
/// A checklist is *complete* iff every key is answered yes or no. Answers
/// stay editable locally after submission; `submitted` only records that
/// the backend accepted the sheet, so the gate knows not to send it again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checklist {
    kind: ChecklistKind,
    answers: Vec<(String, Answer)>,
    note: String,
    submitted: bool,
}

impl Checklist {
    /// Create a fresh sheet with every question unanswered.
    pub fn new(kind: ChecklistKind) -> Self {
        Self {
            kind,
            answers: kind
                .question_keys()
                .iter()
                .map(|key| (key.to_string(), Answer::Unanswered))
                .collect(),
            note: String::new(),
            submitted: false,
        }
    }

    pub fn kind(&self) -> ChecklistKind {
        self.kind
    }

    /// Overwrite the answer for `key`. Returns false when the key is not
    /// one of this checklist's fixed questions.
    pub fn set_answer(&mut self, key: &str, answer: Answer) -> bool {
        match self.answers.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => {
                *slot = answer;
                true
            }
            None => false,
        }
    }

    pub fn answer(&self, key: &str) -> Option<Answer> {
        self.answers.iter().find(|(k, _)| k == key).map(|(_, a)| *a)
    }

    pub fn is_complete(&self) -> bool {
        self.answers.iter().all(|(_, a)| *a != Answer::Unanswered)
    }

    /// Keys still waiting for a yes/no.
    pub fn unanswered(&self) -> Vec<&str> {
        self.answers
            .iter()
            .filter(|(_, a)| *a == Answer::Unanswered)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = note.into();
    }

    pub fn submitted(&self) -> bool {
        self.submitted
    }

    pub fn mark_submitted(&mut self) {
        self.submitted = true;
    }

    /// The flat `key -> bool` map the backend expects. Callers are expected
    /// to gate on `is_complete` first; any unanswered key degrades to `false`.
    pub fn wire_answers(&self) -> Vec<(&str, bool)> {
        self.answers
            .iter()
            .map(|(k, a)| (k.as_str(), a.as_bool().unwrap_or(false)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_checklist_is_incomplete() {
        let checklist = Checklist::new(ChecklistKind::Conditions);
        assert!(!checklist.is_complete());
        assert_eq!(checklist.unanswered().len(), 10);
    }

    #[test]
    fn test_nine_of_ten_answers_is_still_incomplete() {
        let mut checklist = Checklist::new(ChecklistKind::Conditions);
        for key in CONDITION_KEYS.iter().take(9) {
            assert!(checklist.set_answer(key, Answer::Yes));
        }
        assert!(!checklist.is_complete());
        assert_eq!(checklist.unanswered(), vec!["estado_general_aceptable"]);
    }

    #[test]
    fn test_set_answer_overwrites() {
        let mut checklist = Checklist::new(ChecklistKind::Incidents);
        checklist.set_answer("retraso", Answer::Yes);
        checklist.set_answer("retraso", Answer::No);
        assert_eq!(checklist.answer("retraso"), Some(Answer::No));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let mut checklist = Checklist::new(ChecklistKind::Conditions);
        assert!(!checklist.set_answer("retraso", Answer::Yes));
        assert_eq!(checklist.answer("retraso"), None);
    }

    #[test]
    fn test_wire_answers_cover_every_key_in_order() {
        let mut checklist = Checklist::new(ChecklistKind::Incidents);
        for key in INCIDENT_KEYS {
            checklist.set_answer(key, Answer::No);
        }
        checklist.set_answer("accidente", Answer::Yes);

        let wire = checklist.wire_answers();
        assert_eq!(wire.len(), 10);
        assert_eq!(wire[0], ("retraso", false));
        assert!(wire.contains(&("accidente", true)));
    }
}
