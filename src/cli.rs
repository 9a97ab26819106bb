//! Interface de linha de comando baseada em clap.
//!
//! Sem argumentos, cadastra as linhas pendentes da planilha; o subcomando
//! `check` consulta o status dos cadastros já enviados.

use clap::{Parser, Subcommand};

/// Cadastro em lote de contatos no ChatGuru a partir de uma planilha.
#[derive(Debug, Parser)]
#[command(name = "chatguru-import", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Consulta o status de cada cadastro enviado e grava o resultado na planilha.
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn no_arguments_runs_registration() {
        let cli = Cli::parse_from(["chatguru-import"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn check_subcommand() {
        let cli = Cli::parse_from(["chatguru-import", "check"]);
        assert_eq!(cli.command, Some(Command::Check));
    }

    #[test]
    fn unknown_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["chatguru-import", "status"]).is_err());
        assert!(Cli::try_parse_from(["chatguru-import", "--verbose"]).is_err());
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
