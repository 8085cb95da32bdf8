use serde::Serialize;
use std::fmt;

const TAMANHO_CNPJ: usize = 14;

// Pesos dos dígitos verificadores
const PESOS_DV1: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const PESOS_DV2: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// CNPJ com 14 dígitos e dígitos verificadores conferidos.
///
/// Só é construído por [`validate`], então possuir um `Cnpj` implica validade.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Cnpj(String);

impl Cnpj {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Formato com pontuação: `XX.XXX.XXX/XXXX-XX`
    pub fn formatted(&self) -> String {
        let d = &self.0;
        format!("{}.{}.{}/{}-{}", &d[0..2], &d[2..5], &d[5..8], &d[8..12], &d[12..14])
    }
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tipo", content = "cnpj", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Empty,
    WrongLength,
    ChecksumFailed,
    Valid(Cnpj),
}

/// Remove tudo que não for dígito ASCII, preservando a ordem.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Calcula os dois dígitos verificadores a partir dos 12 primeiros dígitos.
pub fn check_digits(base: &[u8; 12]) -> (u8, u8) {
    let dv1 = check_digit(base, &PESOS_DV1);

    let mut com_dv1 = [0u8; 13];
    com_dv1[..12].copy_from_slice(base);
    com_dv1[12] = dv1;
    let dv2 = check_digit(&com_dv1, &PESOS_DV2);

    (dv1, dv2)
}

fn check_digit(digits: &[u8], weights: &[u32]) -> u8 {
    let soma: u32 = digits
        .iter()
        .zip(weights)
        .map(|(&d, &w)| u32::from(d) * w)
        .sum();

    let digito = 11 - (soma % 11);
    if digito > 9 {
        0
    } else {
        digito as u8
    }
}

/// Valida um CNPJ já normalizado (somente dígitos).
pub fn validate(normalized: &str) -> ValidationOutcome {
    if normalized.is_empty() {
        return ValidationOutcome::Empty;
    }

    if normalized.chars().count() != TAMANHO_CNPJ {
        return ValidationOutcome::WrongLength;
    }

    let digits: Vec<u8> = match normalized
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect::<Option<Vec<u8>>>()
    {
        Some(digits) => digits,
        None => return ValidationOutcome::ChecksumFailed,
    };

    // Sequências repetidas (00000000000000, 11111111111111, ...) são inválidas
    if digits.iter().all(|&d| d == digits[0]) {
        return ValidationOutcome::ChecksumFailed;
    }

    let mut base = [0u8; 12];
    base.copy_from_slice(&digits[..12]);
    let (dv1, dv2) = check_digits(&base);

    if digits[12] == dv1 && digits[13] == dv2 {
        ValidationOutcome::Valid(Cnpj(normalized.to_string()))
    } else {
        ValidationOutcome::ChecksumFailed
    }
}
