//! Interface de linha de comando do kcache.

pub mod commands;
pub mod interactive;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kcache - política de cache LRU-K para resultados de compilação.
#[derive(Parser, Debug)]
#[command(name = "kcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Arquivo de configuração.
    #[arg(short, long, default_value = "kcache.toml")]
    pub config: PathBuf,

    /// Modo verbose.
    #[arg(short, long)]
    pub verbose: bool,

    /// Modo silencioso.
    #[arg(short, long)]
    pub quiet: bool,

    /// Comando a executar.
    #[command(subcommand)]
    pub command: Commands,
}

/// Comandos disponíveis.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inicializa configuração no diretório atual.
    Init {
        /// Diretório de destino (padrão: diretório atual).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Configura opções interativamente.
    Config,

    /// Mostra a configuração efetiva da política.
    Status,

    /// Reproduz um trace JSON de requisições de compilação.
    Replay {
        /// Arquivo de trace (`{"requests": [...]}`).
        trace: PathBuf,

        /// Número de workers (padrão: valor da configuração).
        #[arg(short, long)]
        threads: Option<usize>,

        /// Imprime o relatório em JSON.
        #[arg(long)]
        json: bool,
    },

    /// Mostra versão.
    Version,
}
