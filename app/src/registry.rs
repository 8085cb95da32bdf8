use anyhow::{Context, Result};
use async_trait::async_trait;
use std::error::Error as StdError;
use std::io;
use std::time::Instant;

use crate::cnpj::Cnpj;
use crate::config::RegistryConfig;
use crate::mapper;
use crate::models::QueryOutcome;

/// Fonte de dados cadastrais consultada pelo orquestrador.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn lookup(&self, cnpj: &Cnpj) -> QueryOutcome;
}

/// Cliente HTTP da ReceitaWS. Faz uma única tentativa por consulta.
pub struct RegistryClient {
    http: reqwest::Client,
    config: RegistryConfig,
}

impl RegistryClient {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .context("Falha ao criar cliente HTTP")?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl Registry for RegistryClient {
    async fn lookup(&self, cnpj: &Cnpj) -> QueryOutcome {
        let url = self.config.lookup_url(cnpj.as_str());
        let inicio = Instant::now();
        tracing::debug!(%url, "consultando serviço de CNPJ");

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return transport_failure(&url, &e),
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "serviço de CNPJ respondeu com erro HTTP");
            return QueryOutcome::TransportError(format!(
                "Requisição falhou: {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            ));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return transport_failure(&url, &e),
        };

        tracing::debug!(
            %url,
            tamanho = body.len(),
            ms = inicio.elapsed().as_millis() as u64,
            "resposta recebida"
        );
        mapper::map_response(&body)
    }
}

fn transport_failure(url: &str, err: &reqwest::Error) -> QueryOutcome {
    if is_timeout(err) {
        tracing::warn!(%url, erro = %err, "tempo limite excedido");
        return QueryOutcome::Timeout;
    }

    let detalhe = describe(err);
    tracing::warn!(%url, erro = %detalhe, "falha de transporte");
    QueryOutcome::TransportError(detalhe)
}

// Timeouts de leitura podem chegar como io::Error dentro da cadeia de causas
fn is_timeout(err: &reqwest::Error) -> bool {
    if err.is_timeout() {
        return true;
    }

    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut detalhe = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        detalhe.push_str(": ");
        detalhe.push_str(&cause.to_string());
        source = cause.source();
    }
    detalhe
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnpj::{validate, ValidationOutcome};
    use actix_web::{web, App, HttpResponse, HttpServer};
    use std::time::Duration;

    fn cnpj(digits: &str) -> Cnpj {
        match validate(digits) {
            ValidationOutcome::Valid(cnpj) => cnpj,
            other => panic!("CNPJ de teste inválido: {:?}", other),
        }
    }

    async fn fake_receitaws(id: web::Path<String>) -> HttpResponse {
        match id.as_str() {
            "11222333000181" => HttpResponse::Ok().content_type("application/json").body(
                r#"{"status":"OK","nome":"EMPRESA EXEMPLO LTDA","situacao":"ATIVA","uf":"SP"}"#,
            ),
            "00623904000173" => HttpResponse::TooManyRequests().finish(),
            "60701190000104" => {
                actix_web::rt::time::sleep(Duration::from_secs(3)).await;
                HttpResponse::Ok().body("{}")
            }
            "00000000000191" => HttpResponse::Ok().body("<html>manutenção</html>"),
            _ => HttpResponse::Ok().body(r#"{"status":"ERROR","message":"CNPJ inválido"}"#),
        }
    }

    fn start_fake_server() -> String {
        let server = HttpServer::new(|| {
            App::new().route("/v1/cnpj/{id}", web::get().to(fake_receitaws))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind do servidor de teste");

        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{}", addr)
    }

    fn client(base_url: &str, read_timeout: Duration) -> RegistryClient {
        let config = RegistryConfig {
            base_url: base_url.to_string(),
            connect_timeout: Duration::from_secs(2),
            read_timeout,
            ..RegistryConfig::default()
        };
        RegistryClient::new(config).unwrap()
    }

    #[actix_web::test]
    async fn successful_lookup_is_mapped() {
        let base = start_fake_server();
        let client = client(&base, Duration::from_secs(5));

        match client.lookup(&cnpj("11222333000181")).await {
            QueryOutcome::Success(record) => {
                assert_eq!(record.legal_name, "EMPRESA EXEMPLO LTDA");
                assert_eq!(record.status, "ATIVA");
                assert_eq!(record.state, "SP");
            }
            other => panic!("esperava Success, veio {:?}", other),
        }
    }

    #[actix_web::test]
    async fn api_error_payload() {
        let base = start_fake_server();
        let client = client(&base, Duration::from_secs(5));

        assert_eq!(
            client.lookup(&cnpj("11444777000161")).await,
            QueryOutcome::ApiError("CNPJ inválido".to_string())
        );
    }

    #[actix_web::test]
    async fn non_success_status_is_transport_error() {
        let base = start_fake_server();
        let client = client(&base, Duration::from_secs(5));

        assert_eq!(
            client.lookup(&cnpj("00623904000173")).await,
            QueryOutcome::TransportError("Requisição falhou: 429 - Too Many Requests".to_string())
        );
    }

    #[actix_web::test]
    async fn html_body_is_malformed() {
        let base = start_fake_server();
        let client = client(&base, Duration::from_secs(5));

        assert_eq!(
            client.lookup(&cnpj("00000000000191")).await,
            QueryOutcome::MalformedResponse
        );
    }

    #[actix_web::test]
    async fn slow_server_times_out() {
        let base = start_fake_server();
        let client = client(&base, Duration::from_millis(300));

        assert_eq!(client.lookup(&cnpj("60701190000104")).await, QueryOutcome::Timeout);
    }

    #[actix_web::test]
    async fn refused_connection_is_transport_error() {
        // porta livre sem ninguém escutando
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = client(&format!("http://127.0.0.1:{}", port), Duration::from_secs(2));

        match client.lookup(&cnpj("11222333000181")).await {
            QueryOutcome::TransportError(detalhe) => assert!(!detalhe.is_empty()),
            other => panic!("esperava TransportError, veio {:?}", other),
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = RegistryConfig {
            base_url: "receitaws.com.br".to_string(),
            ..RegistryConfig::default()
        };
        assert!(RegistryClient::new(config).is_err());
    }
}
