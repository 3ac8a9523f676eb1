use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use rust_decimal::Decimal;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_integer(value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .with_context(|| format!("Failed to parse '{value}' as integer"))
}

/// Parses a monetary amount, tolerating a leading currency sign and thousands
/// separators (`-$1,250.50`, `$-1250.5`, `1250.50`).
pub fn parse_money(value: &str) -> Result<Decimal> {
    let trimmed = value.trim();
    let (mut negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    let mut rest = rest.strip_prefix('$').unwrap_or(rest);
    if !negative && let Some(unsigned) = rest.strip_prefix('-') {
        negative = true;
        rest = unsigned;
    }
    if rest.starts_with('-') || (negative && rest.starts_with('+')) {
        return Err(anyhow!("Failed to parse '{value}' as decimal: repeated sign"));
    }
    let cleaned: String = rest.chars().filter(|ch| *ch != ',').collect();
    let parsed = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .with_context(|| format!("Failed to parse '{value}' as decimal"))?;
    Ok(if negative { -parsed } else { parsed })
}

pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' => c,
            _ => '_',
        })
        .collect::<String>()
        .to_ascii_lowercase()
}

pub fn is_null_token(value: &str, tokens: &[String]) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || tokens.iter().any(|token| token.eq_ignore_ascii_case(trimmed))
}
