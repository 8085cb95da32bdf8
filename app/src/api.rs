use actix_web::{web, HttpResponse};
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;

use crate::config::RegistryConfig;
use crate::orchestrator::{self, FinalOutcome, ReportLine};
use crate::registry::{Registry, RegistryClient};
use crate::ui;

#[derive(Serialize)]
pub struct ConsultaResponse {
    pub cnpj_recebido: String,
    pub linhas: Vec<String>,
    pub resultado: FinalOutcome,
}

pub struct AppState {
    pub registry: Arc<dyn Registry>,
}

pub async fn consultar_cnpj(
    cnpj: web::Path<String>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let cnpj_recebido = cnpj.into_inner();

    let mut linhas: Vec<ReportLine> = Vec::new();
    let resultado =
        orchestrator::validate_and_fetch(&cnpj_recebido, state.registry.as_ref(), &mut linhas)
            .await;

    let rejeitado = matches!(resultado, FinalOutcome::Rejected(_));
    let response = ConsultaResponse {
        cnpj_recebido,
        linhas: linhas.into_iter().map(|l| l.text).collect(),
        resultado,
    };

    if rejeitado {
        HttpResponse::BadRequest().json(response)
    } else {
        HttpResponse::Ok().json(response)
    }
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "mensagem": "API de validação de CNPJ está funcionando"
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/cnpj/{cnpj}", web::get().to(consultar_cnpj))
        .route("/health", web::get().to(health_check));
}

pub async fn start_server(config: RegistryConfig, host: &str, port: u16) -> anyhow::Result<()> {
    let base_url = config.base_url.clone();
    let registry: Arc<dyn Registry> = Arc::new(RegistryClient::new(config)?);
    let app_state = web::Data::new(AppState { registry });

    let address = format!("{}:{}", host, port);

    ui::print_header("🌐 Servidor API REST");
    ui::print_success(&format!("Servidor iniciando em http://{}", address));
    ui::print_info(&format!("Consultas encaminhadas para {}", base_url));
    ui::print_info("Endpoints disponíveis:");
    use colored::Colorize;
    println!("  {} GET /cnpj/{{cnpj}}  - Valida e consulta um CNPJ", "•".cyan());
    println!("  {} GET /health         - Verifica status do servidor", "•".cyan());
    ui::print_verbose(&format!("Exemplo: curl http://{}/cnpj/11222333000181", address));
    ui::print_separator();

    actix_web::HttpServer::new(move || {
        actix_web::App::new()
            .app_data(app_state.clone())
            .configure(configure)
    })
    .bind(&address)
    .with_context(|| format!("Falha ao escutar em {}", address))?
    .run()
    .await?;

    Ok(())
}
