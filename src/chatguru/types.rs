//! Tipos de dados trocados com a API ChatGuru.

use serde_json::Value;

/// Dados de um contato a cadastrar, já normalizados a partir da linha da planilha.
///
/// Campos opcionais em branco chegam aqui como `None` e são omitidos da requisição.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRequest {
    pub name: String,
    pub chat_number: String,
    pub phone_id: Option<String>,
    pub dialog_id: Option<String>,
    pub user_id: Option<String>,
}

/// Estado de um cadastro retornado pela consulta de status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReply {
    /// Estado informado pelo servidor (ex.: "pending", "done", "error").
    pub state: String,
    /// Descrição livre que acompanha o estado.
    pub description: String,
}

impl StatusReply {
    /// `done` e `error` encerram o processamento do lado remoto.
    pub fn is_terminal(&self) -> bool {
        let state = self.state.trim();
        state.eq_ignore_ascii_case("done") || state.eq_ignore_ascii_case("error")
    }
}

/// Lê um campo textual de um objeto JSON, aceitando string ou número.
/// Strings vazias contam como ausentes.
pub(crate) fn text_field(body: &Value, field: &str) -> Option<String> {
    match body.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Converte texto da planilha em campo opcional: em branco vira `None`.
pub(crate) fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn terminal_states() {
        let reply = |state: &str| StatusReply {
            state: state.into(),
            description: String::new(),
        };
        assert!(reply("done").is_terminal());
        assert!(reply("ERROR").is_terminal());
        assert!(!reply("pending").is_terminal());
        assert!(!reply("").is_terminal());
    }

    #[test]
    fn text_field_accepts_strings_and_numbers() {
        let body = json!({"id": "abc", "num": 42, "blank": "  ", "obj": {}});
        assert_eq!(text_field(&body, "id"), Some("abc".into()));
        assert_eq!(text_field(&body, "num"), Some("42".into()));
        assert_eq!(text_field(&body, "blank"), None);
        assert_eq!(text_field(&body, "obj"), None);
        assert_eq!(text_field(&body, "missing"), None);
    }

    #[test]
    fn non_blank_trims() {
        assert_eq!(non_blank("  123 "), Some("123".into()));
        assert_eq!(non_blank("   "), None);
    }
}
