//! Sequência de validação e consulta de um CNPJ.
//!
//! Normaliza a entrada, confere os dígitos verificadores e, se o CNPJ for
//! válido, consulta a ReceitaWS. Cada etapa emite linhas de texto para um
//! [`ReportSink`]; quem chama decide como exibi-las.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cnpj::{self, Cnpj, ValidationOutcome};
use crate::models::{CompanyRecord, QueryOutcome};
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Info,
    Success,
    Warning,
    Error,
    Detail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub kind: LineKind,
    pub text: String,
}

impl ReportLine {
    fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }
}

/// Destino das linhas de resultado, na ordem em que são produzidas.
pub trait ReportSink {
    fn emit(&mut self, line: ReportLine);
}

impl ReportSink for Vec<ReportLine> {
    fn emit(&mut self, line: ReportLine) {
        self.push(line);
    }
}

impl ReportSink for mpsc::UnboundedSender<ReportLine> {
    fn emit(&mut self, line: ReportLine) {
        // Receptor descartado: ninguém mais quer o resultado
        let _ = self.send(line);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "etapa", content = "dados", rename_all = "snake_case")]
pub enum FinalOutcome {
    Rejected(ValidationOutcome),
    Queried { cnpj: Cnpj, outcome: QueryOutcome },
}

/// Validação local, sem rede. Emite os avisos de entrada e a confirmação de validade.
pub fn check<S: ReportSink + ?Sized>(raw: &str, sink: &mut S) -> ValidationOutcome {
    let digitado = raw.trim();
    let outcome = cnpj::validate(&cnpj::normalize(raw));

    match &outcome {
        ValidationOutcome::Empty => {
            sink.emit(ReportLine::new(LineKind::Warning, "Por favor, digite um CNPJ."));
        }
        ValidationOutcome::WrongLength => {
            sink.emit(ReportLine::new(LineKind::Warning, "CNPJ deve ter 14 dígitos."));
        }
        ValidationOutcome::ChecksumFailed => {
            sink.emit(ReportLine::new(
                LineKind::Error,
                format!("CNPJ {} é matematicamente inválido.", digitado),
            ));
            sink.emit(ReportLine::new(
                LineKind::Warning,
                "Por favor, verifique os dígitos e tente novamente.",
            ));
        }
        ValidationOutcome::Valid(_) => {
            sink.emit(ReportLine::new(
                LineKind::Success,
                format!("CNPJ {} é matematicamente válido.", digitado),
            ));
        }
    }

    outcome
}

/// Valida e, se o CNPJ for válido, consulta o cadastro.
pub async fn validate_and_fetch<S: ReportSink + ?Sized>(
    raw: &str,
    registry: &dyn Registry,
    sink: &mut S,
) -> FinalOutcome {
    let cnpj = match check(raw, sink) {
        ValidationOutcome::Valid(cnpj) => cnpj,
        rejected => {
            tracing::debug!(outcome = ?rejected, "CNPJ rejeitado na validação local");
            return FinalOutcome::Rejected(rejected);
        }
    };

    sink.emit(ReportLine::new(
        LineKind::Info,
        format!("Consultando ReceitaWS para {}...", cnpj),
    ));

    let outcome = registry.lookup(&cnpj).await;
    report_query(&cnpj, &outcome, sink);
    tracing::info!(cnpj = %cnpj, outcome = ?outcome, "consulta concluída");

    FinalOutcome::Queried { cnpj, outcome }
}

fn report_query<S: ReportSink + ?Sized>(cnpj: &Cnpj, outcome: &QueryOutcome, sink: &mut S) {
    match outcome {
        QueryOutcome::Success(record) => {
            report_record(cnpj, record, sink);
            sink.emit(final_status(record));
        }
        QueryOutcome::ApiError(message) => {
            sink.emit(ReportLine::new(
                LineKind::Error,
                format!("Erro na consulta da API: {}", message),
            ));
            sink.emit(ReportLine::new(
                LineKind::Warning,
                "Por favor, tente novamente mais tarde ou verifique o CNPJ.",
            ));
        }
        QueryOutcome::Timeout => {
            sink.emit(ReportLine::new(
                LineKind::Error,
                "Erro de conexão: Tempo limite excedido ao consultar a API. Verifique sua internet.",
            ));
        }
        QueryOutcome::TransportError(detalhe) => {
            sink.emit(ReportLine::new(
                LineKind::Error,
                format!("Erro ao consultar a API: {}", detalhe),
            ));
        }
        QueryOutcome::MalformedResponse => {
            sink.emit(ReportLine::new(
                LineKind::Error,
                "Erro ao processar a resposta da API (JSON inválido).",
            ));
        }
    }
}

fn report_record<S: ReportSink + ?Sized>(cnpj: &Cnpj, record: &CompanyRecord, sink: &mut S) {
    let endereco = if record.complement.is_empty() {
        format!("{}, {}", record.street, record.number)
    } else {
        format!("{}, {} - {}", record.street, record.number, record.complement)
    };

    let linhas = [
        String::new(),
        "--- Dados da Empresa (ReceitaWS) ---".to_string(),
        format!("CNPJ: {}", cnpj),
        format!("Razão Social: {}", record.legal_name),
        format!("Nome Fantasia: {}", record.trade_name),
        "Inscrição Estadual: Não disponível na ReceitaWS (API pública)".to_string(),
        format!("Status na Receita: {}", record.status),
        format!("Endereço: {}", endereco),
        format!("Bairro: {}", record.district),
        format!("Cidade/UF: {}/{}", record.city, record.state),
        format!("CEP: {}", record.postal_code),
        "------------------------".to_string(),
    ];

    for linha in linhas {
        sink.emit(ReportLine::new(LineKind::Detail, linha));
    }
}

fn final_status(record: &CompanyRecord) -> ReportLine {
    if record.is_active() {
        ReportLine::new(
            LineKind::Success,
            "Status Final: CNPJ está **ATIVO** na Receita Federal.",
        )
    } else {
        ReportLine::new(
            LineKind::Warning,
            format!(
                "Status Final: CNPJ está **{}** na Receita Federal. Pode ser inválido para operações.",
                record.status
            ),
        )
    }
}

/// Validação em execução numa task própria.
pub struct ValidationTask {
    pub lines: mpsc::UnboundedReceiver<ReportLine>,
    pub handle: JoinHandle<FinalOutcome>,
}

/// Dispara a validação numa task do tokio. O canal de linhas fecha quando a task termina.
pub fn spawn_validation(raw: String, registry: Arc<dyn Registry>) -> ValidationTask {
    let (tx, rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let mut tx = tx;
        validate_and_fetch(&raw, registry.as_ref(), &mut tx).await
    });

    ValidationTask { lines: rx, handle }
}
