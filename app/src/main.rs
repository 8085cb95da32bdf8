mod api;
mod cnpj;
mod config;
mod mapper;
mod models;
mod orchestrator;
mod registry;
mod ui;

use anyhow::Result;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::cnpj::ValidationOutcome;
use crate::config::{RegistryConfig, RECEITAWS_URL};
use crate::models::QueryOutcome;
use crate::orchestrator::{FinalOutcome, ReportLine};
use crate::registry::{Registry, RegistryClient};

#[derive(Parser)]
#[command(name = "validador-cnpj")]
#[command(about = "Valida CNPJs e consulta os dados cadastrais na ReceitaWS", long_about = None)]
struct Cli {
    /// Modo silencioso (somente as linhas de resultado)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Modo verboso (mais detalhes)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Nível dos logs técnicos em stderr (RUST_LOG tem precedência)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RegistryArgs {
    /// URL base do serviço de consulta
    #[arg(long, env = "CNPJ_REGISTRY_URL", default_value = RECEITAWS_URL)]
    registry_url: String,

    /// Tempo limite de conexão, em segundos
    #[arg(long, env = "CNPJ_CONNECT_TIMEOUT", default_value = "10")]
    connect_timeout: u64,

    /// Tempo limite de leitura, em segundos
    #[arg(long, env = "CNPJ_READ_TIMEOUT", default_value = "10")]
    read_timeout: u64,
}

impl RegistryArgs {
    fn to_config(&self) -> Result<RegistryConfig> {
        Ok(RegistryConfig::new(
            &self.registry_url,
            self.connect_timeout,
            self.read_timeout,
        )?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Confere os dígitos verificadores, sem acessar a rede
    Validar {
        /// Um ou mais CNPJs, com ou sem pontuação
        #[arg(required = true)]
        cnpjs: Vec<String>,
    },
    /// Valida e consulta os dados cadastrais na ReceitaWS
    Consultar {
        /// Um ou mais CNPJs, com ou sem pontuação
        #[arg(required = true)]
        cnpjs: Vec<String>,
        #[command(flatten)]
        registry: RegistryArgs,
    },
    /// Inicia servidor web API para validação e consulta de CNPJ
    Server {
        /// Porta do servidor
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Endereço do servidor
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[command(flatten)]
        registry: RegistryArgs,
    },
}

fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn validar(cnpjs: &[String]) {
    ui::print_header("🔎 Validação de CNPJ");

    let mut validos = 0u64;
    for raw in cnpjs {
        let mut linhas: Vec<ReportLine> = Vec::new();
        if let ValidationOutcome::Valid(cnpj) = orchestrator::check(raw, &mut linhas) {
            validos += 1;
            ui::print_verbose(&format!("Formatado: {}", cnpj.formatted()));
        }
        linhas.iter().for_each(ui::print_report_line);
    }

    if cnpjs.len() > 1 {
        ui::print_statistics(&[
            ("Válidos", validos),
            ("Inválidos", cnpjs.len() as u64 - validos),
        ]);
    }
}

async fn consultar(cnpjs: Vec<String>, config: RegistryConfig) -> Result<()> {
    ui::print_header("📡 Consulta de CNPJ na ReceitaWS");
    ui::print_info(&format!("Hora de início: {}", Local::now().format("%Y-%m-%d %H:%M:%S")));
    ui::print_verbose(&format!("Serviço: {}", config.base_url));

    let registry: Arc<dyn Registry> = Arc::new(RegistryClient::new(config)?);

    // Uma task por CNPJ; a saída é exibida na ordem de entrada
    let total = cnpjs.len();
    let tasks: Vec<_> = cnpjs
        .into_iter()
        .map(|raw| orchestrator::spawn_validation(raw, registry.clone()))
        .collect();

    let (mut rejeitados, mut ativos, mut inativos, mut falhas) = (0u64, 0u64, 0u64, 0u64);
    for (idx, mut task) in tasks.into_iter().enumerate() {
        if total > 1 {
            ui::print_separator();
            ui::print_verbose(&format!("CNPJ {}/{}", idx + 1, total));
        }

        while let Some(line) = task.lines.recv().await {
            ui::print_report_line(&line);
        }

        match task.handle.await {
            Ok(FinalOutcome::Rejected(_)) => rejeitados += 1,
            Ok(FinalOutcome::Queried { outcome: QueryOutcome::Success(record), .. }) => {
                if record.is_active() {
                    ativos += 1;
                } else {
                    inativos += 1;
                }
            }
            Ok(FinalOutcome::Queried { .. }) => falhas += 1,
            Err(e) => {
                tracing::error!(erro = %e, "task de validação terminou de forma inesperada");
                ui::print_error(&format!("Ocorreu um erro inesperado: {}", e));
                falhas += 1;
            }
        }
    }

    if total > 1 {
        ui::print_statistics(&[
            ("Rejeitados na validação", rejeitados),
            ("Ativos", ativos),
            ("Não ativos", inativos),
            ("Falhas na consulta", falhas),
        ]);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Inicializa o módulo de UI com as configurações globais
    ui::init(cli.quiet, cli.verbose);
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Validar { cnpjs } => {
            validar(&cnpjs);
        }
        Commands::Consultar { cnpjs, registry } => {
            consultar(cnpjs, registry.to_config()?).await?;
        }
        Commands::Server { port, host, registry } => {
            api::start_server(registry.to_config()?, &host, port).await?;
        }
    }

    Ok(())
}
