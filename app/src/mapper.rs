use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{CompanyRecord, QueryOutcome, ERRO_DESCONHECIDO_API, NAO_INFORMADO};

#[derive(Debug, Error)]
enum MappingError {
    #[error("JSON inválido: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("resposta não é um objeto JSON")]
    NotAnObject,

    #[error("campo '{0}' não é texto")]
    UnexpectedType(&'static str),
}

/// Converte o corpo de uma resposta da ReceitaWS em `QueryOutcome`.
pub fn map_response(body: &str) -> QueryOutcome {
    match try_map(body) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(erro = %e, tamanho = body.len(), "resposta da API não pôde ser interpretada");
            QueryOutcome::MalformedResponse
        }
    }
}

fn try_map(body: &str) -> Result<QueryOutcome, MappingError> {
    let json: Value = serde_json::from_str(body)?;
    let obj = json.as_object().ok_or(MappingError::NotAnObject)?;

    // A API sinaliza erro com status "ERROR" no próprio corpo
    if string_or(obj, "status", "")? == "ERROR" {
        let message = string_or(obj, "message", ERRO_DESCONHECIDO_API)?;
        return Ok(QueryOutcome::ApiError(message));
    }

    let record = CompanyRecord {
        trade_name: string_or(obj, "fantasia", NAO_INFORMADO)?,
        legal_name: string_or(obj, "nome", NAO_INFORMADO)?,
        status: string_or(obj, "situacao", NAO_INFORMADO)?,
        street: string_or(obj, "logradouro", "")?,
        number: string_or(obj, "numero", "")?,
        complement: string_or(obj, "complemento", "")?,
        district: string_or(obj, "bairro", "")?,
        city: string_or(obj, "municipio", "")?,
        state: string_or(obj, "uf", "")?,
        postal_code: string_or(obj, "cep", "")?,
    };

    Ok(QueryOutcome::Success(record))
}

// Chave ausente e valor null são tratados da mesma forma
fn string_or(
    obj: &Map<String, Value>,
    key: &'static str,
    default: &str,
) -> Result<String, MappingError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(default.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(MappingError::UnexpectedType(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(body: &str) -> CompanyRecord {
        match map_response(body) {
            QueryOutcome::Success(record) => record,
            other => panic!("esperava Success, veio {:?}", other),
        }
    }

    #[test]
    fn maps_full_payload() {
        let body = r#"{
            "status": "OK",
            "cnpj": "11.222.333/0001-81",
            "nome": "EMPRESA EXEMPLO LTDA",
            "fantasia": "EXEMPLO",
            "situacao": "ATIVA",
            "logradouro": "RUA DAS FLORES",
            "numero": "100",
            "complemento": "SALA 2",
            "bairro": "CENTRO",
            "municipio": "SAO PAULO",
            "uf": "SP",
            "cep": "01.001-000",
            "atividade_principal": [{"code": "62.01-5-01", "text": "Desenvolvimento"}]
        }"#;

        let record = success(body);
        assert_eq!(record.legal_name, "EMPRESA EXEMPLO LTDA");
        assert_eq!(record.trade_name, "EXEMPLO");
        assert_eq!(record.status, "ATIVA");
        assert_eq!(record.street, "RUA DAS FLORES");
        assert_eq!(record.number, "100");
        assert_eq!(record.complement, "SALA 2");
        assert_eq!(record.district, "CENTRO");
        assert_eq!(record.city, "SAO PAULO");
        assert_eq!(record.state, "SP");
        assert_eq!(record.postal_code, "01.001-000");
    }

    #[test]
    fn null_status_uses_placeholder() {
        let record = success(r#"{"situacao": null}"#);
        assert_eq!(record.status, NAO_INFORMADO);
    }

    #[test]
    fn absent_and_null_are_equivalent() {
        let absent = success("{}");
        let null = success(
            r#"{"fantasia": null, "nome": null, "situacao": null, "logradouro": null,
                "numero": null, "complemento": null, "bairro": null, "municipio": null,
                "uf": null, "cep": null}"#,
        );
        assert_eq!(absent, null);
        assert_eq!(absent, CompanyRecord::default());
    }

    #[test]
    fn empty_string_is_kept() {
        let record = success(r#"{"fantasia": ""}"#);
        assert_eq!(record.trade_name, "");
    }

    #[test]
    fn api_error_with_message() {
        assert_eq!(
            map_response(r#"{"status":"ERROR","message":"CNPJ inválido"}"#),
            QueryOutcome::ApiError("CNPJ inválido".to_string())
        );
    }

    #[test]
    fn api_error_without_message() {
        assert_eq!(
            map_response(r#"{"status":"ERROR"}"#),
            QueryOutcome::ApiError(ERRO_DESCONHECIDO_API.to_string())
        );
        assert_eq!(
            map_response(r#"{"status":"ERROR","message":null}"#),
            QueryOutcome::ApiError(ERRO_DESCONHECIDO_API.to_string())
        );
    }

    #[test]
    fn error_sentinel_is_case_sensitive() {
        assert!(matches!(
            map_response(r#"{"status":"error","message":"x"}"#),
            QueryOutcome::Success(_)
        ));
    }

    #[test]
    fn numbers_are_rendered_as_text() {
        let record = success(r#"{"numero": 100}"#);
        assert_eq!(record.number, "100");
    }

    #[test]
    fn malformed_bodies() {
        for body in ["", "not json", "{\"nome\":", "[1,2,3]", "\"texto\"", "null", r#"{"nome": {"a": 1}}"#] {
            assert_eq!(map_response(body), QueryOutcome::MalformedResponse, "{}", body);
        }
    }
}
