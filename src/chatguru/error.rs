//! Tipos de erro para o cliente da API ChatGuru.
//!
//! [`RegistrationError`] cobre a chamada de cadastro (`chat_add`) e
//! [`StatusError`] a consulta de status (`chat_add_status`). O texto de
//! `Display` de cada variante é exatamente o que vai para a planilha.

use thiserror::Error;

/// Falhas possíveis ao cadastrar um contato.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// O servidor respondeu HTTP 400 com uma descrição estruturada.
    #[error("{0}")]
    Rejected(String),

    /// Resposta de sucesso, mas sem o identificador de cadastro.
    #[error("no registration id returned")]
    MissingId,

    /// Qualquer outro status HTTP fora da faixa 2xx.
    #[error("HTTP {status}")]
    Http { status: u16 },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

/// Falhas possíveis ao consultar o status de um cadastro.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("HTTP {status}")]
    Http { status: u16 },

    /// Corpo da resposta sem o campo de estado ou fora do formato JSON.
    #[error("invalid status response: {0}")]
    InvalidBody(String),

    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}
