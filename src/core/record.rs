//! Token Record Builder
//!
//! Pure merge of on-chain facts and an optional risk verdict into the row that
//! gets persisted. Every optional verdict field has a default, so any verdict
//! shape produces a record.

use serde_json::{json, Value};

use crate::models::types::{
    iso8601_from_unix, Candidate, Erc20Facts, RiskFields, RiskVerdict, TokenRecord,
};

/// Categorical default for anything the scorer did not say
pub const UNKNOWN: &str = "unknown";

/// Build the persisted record for a detected token
pub fn build(candidate: &Candidate, erc20: &Erc20Facts, verdict: Option<&RiskVerdict>) -> TokenRecord {
    TokenRecord {
        contract_address: candidate.contract_address.to_checksum(None),
        creator_address: candidate.creator_address.to_checksum(None),
        created_block_datetime: iso8601_from_unix(candidate.block_timestamp),
        name: erc20.name.clone(),
        symbol: erc20.symbol.clone(),
        decimals: erc20.decimals,
        blockchain: candidate.network.clone(),
        risk: verdict.map(risk_fields),
    }
}

/// Flatten a verdict into the risk columns
pub fn risk_fields(verdict: &RiskVerdict) -> RiskFields {
    let mut indicators = verdict.list("phishing_indicators");
    if indicators.is_empty() {
        indicators = verdict.list("indicators");
    }
    let urls = verdict.detail_list("urls_found");
    let amounts = verdict.detail_list("money_amounts");

    let fraud_type = verdict
        .text("fraud_type")
        .unwrap_or_else(|| infer_fraud_type(verdict, &indicators, &urls, &amounts).to_string());

    let risk_category = verdict
        .text("risk_category")
        .unwrap_or_else(|| category_for(&fraud_type).to_string());

    let detection_details = json!({
        "phishing_indicators": indicators,
        "urls_found": urls,
        "money_amounts": amounts,
        "risk_score": verdict.number("risk_score"),
        "details": verdict.get("details").cloned().unwrap_or(Value::Null),
    });

    RiskFields {
        risk_category,
        fraud_type,
        detection_details,
    }
}

/// Fraud type when the scorer gave evidence but no label.
/// URLs together with indicators or amounts read as phishing.
fn infer_fraud_type(
    verdict: &RiskVerdict,
    indicators: &[Value],
    urls: &[Value],
    amounts: &[Value],
) -> &'static str {
    if !urls.is_empty() && (!indicators.is_empty() || !amounts.is_empty()) {
        return "phishing";
    }
    let has_evidence = !urls.is_empty() || !indicators.is_empty() || !amounts.is_empty();
    if has_evidence || verdict.flag("is_suspicious") == Some(true) {
        return "suspicious";
    }
    UNKNOWN
}

/// Risk category implied by a fraud type
pub fn category_for(fraud_type: &str) -> &'static str {
    match fraud_type.to_lowercase().as_str() {
        "phishing" | "counterfeit" | "repeat_scam" => "high risk",
        "suspicious" => "caution",
        _ => UNKNOWN,
    }
}
