use std::fmt;

/// Persisted text for a registration that was submitted but not yet confirmed.
pub const REGISTERED_PENDING_TEXT: &str = "sim (pendente)";
/// Persisted text for a failed submission.
pub const FAILED_TEXT: &str = "erro";

/// Classification of a row's persisted status text.
///
/// Matching trims and ignores case; anything unrecognized is `Other` and is
/// treated as already finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowStatus {
    Pending,
    RegisteredPending,
    Registered,
    Failed,
    Other(String),
}

impl RowStatus {
    pub fn classify(text: &str) -> Self {
        let normalized = text.trim().to_lowercase();
        match normalized.as_str() {
            "nao" | "não" => RowStatus::Pending,
            REGISTERED_PENDING_TEXT => RowStatus::RegisteredPending,
            "sim" => RowStatus::Registered,
            FAILED_TEXT => RowStatus::Failed,
            _ => RowStatus::Other(text.to_string()),
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Pending => write!(f, "nao"),
            RowStatus::RegisteredPending => write!(f, "{REGISTERED_PENDING_TEXT}"),
            RowStatus::Registered => write!(f, "sim"),
            RowStatus::Failed => write!(f, "{FAILED_TEXT}"),
            RowStatus::Other(text) => write!(f, "{text}"),
        }
    }
}

/// One contact registration task, one spreadsheet line.
///
/// Every field holds the cell text exactly as persisted; blank optional
/// fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactRow {
    pub status: String,
    pub name: String,
    pub phone_id: String,
    pub dialog_id: String,
    pub user_id: String,
    pub chat_number: String,
    pub error_detail: String,
    pub registration_id: String,
    pub status_detail: String,
}

impl ContactRow {
    pub fn state(&self) -> RowStatus {
        RowStatus::classify(&self.status)
    }

    /// Submission accepted: keep the tracking id for the polling phase.
    pub fn mark_registered(&mut self, registration_id: String) {
        self.status = REGISTERED_PENDING_TEXT.to_string();
        self.registration_id = registration_id;
        self.error_detail.clear();
    }

    pub fn mark_failed(&mut self, detail: String) {
        self.status = FAILED_TEXT.to_string();
        self.error_detail = detail;
        self.registration_id.clear();
    }

    /// The tracking id, if it can be polled.
    pub fn pollable_id(&self) -> Option<&str> {
        let id = self.registration_id.trim();
        (!id.is_empty()).then_some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_case_and_whitespace_insensitive() {
        assert_eq!(RowStatus::classify("nao"), RowStatus::Pending);
        assert_eq!(RowStatus::classify("  NAO "), RowStatus::Pending);
        assert_eq!(RowStatus::classify("Não"), RowStatus::Pending);
        assert_eq!(RowStatus::classify("Sim"), RowStatus::Registered);
        assert_eq!(
            RowStatus::classify("Sim (Pendente)"),
            RowStatus::RegisteredPending
        );
        assert_eq!(RowStatus::classify("Erro"), RowStatus::Failed);
    }

    #[test]
    fn unknown_text_is_kept_verbatim() {
        assert_eq!(
            RowStatus::classify("Talvez"),
            RowStatus::Other("Talvez".into())
        );
        assert_eq!(RowStatus::classify(""), RowStatus::Other(String::new()));
    }

    #[test]
    fn display_uses_canonical_vocabulary() {
        assert_eq!(RowStatus::Pending.to_string(), "nao");
        assert_eq!(RowStatus::RegisteredPending.to_string(), "sim (pendente)");
        assert_eq!(RowStatus::Failed.to_string(), "erro");
    }

    #[test]
    fn mark_registered_sets_id_and_clears_error() {
        let mut row = ContactRow {
            status: "nao".into(),
            error_detail: "old".into(),
            ..Default::default()
        };
        row.mark_registered("reg-1".into());
        assert_eq!(row.state(), RowStatus::RegisteredPending);
        assert_eq!(row.registration_id, "reg-1");
        assert!(row.error_detail.is_empty());
        assert_eq!(row.pollable_id(), Some("reg-1"));
    }

    #[test]
    fn mark_failed_clears_stale_id() {
        let mut row = ContactRow {
            status: "nao".into(),
            registration_id: "stale".into(),
            ..Default::default()
        };
        row.mark_failed("HTTP 500".into());
        assert_eq!(row.state(), RowStatus::Failed);
        assert_eq!(row.error_detail, "HTTP 500");
        assert_eq!(row.pollable_id(), None);
    }
}
