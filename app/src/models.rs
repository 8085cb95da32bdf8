use serde::Serialize;

pub const NAO_INFORMADO: &str = "Não informado";
pub const ERRO_DESCONHECIDO_API: &str = "Erro desconhecido da API.";

/// Dados cadastrais retornados pela ReceitaWS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyRecord {
    pub trade_name: String,
    pub legal_name: String,
    pub status: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub district: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl CompanyRecord {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("ATIVA")
    }
}

impl Default for CompanyRecord {
    fn default() -> Self {
        Self {
            trade_name: NAO_INFORMADO.to_string(),
            legal_name: NAO_INFORMADO.to_string(),
            status: NAO_INFORMADO.to_string(),
            street: String::new(),
            number: String::new(),
            complement: String::new(),
            district: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tipo", content = "detalhe", rename_all = "snake_case")]
pub enum QueryOutcome {
    Success(CompanyRecord),
    ApiError(String),
    Timeout,
    TransportError(String),
    MalformedResponse,
}
