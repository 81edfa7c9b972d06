//! Type definitions for the token watcher
//! Data flowing from block observation through enrichment into storage

use alloy_primitives::{Address, B256};
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Chain identity reported by a node at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainIdentity {
    pub chain_id: u64,
    pub latest_block: u64,
}

/// One transaction of a fetched block, reduced to what contract detection needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTransaction {
    pub hash: B256,
    pub from: Address,
    /// Address of the contract this transaction deployed, if any
    pub creates: Option<Address>,
}

/// A block with its transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockData {
    pub number: u64,
    /// Seconds since epoch
    pub timestamp: u64,
    pub transactions: Vec<BlockTransaction>,
}

/// A transaction observed to have deployed a contract, pending ERC20 classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub contract_address: Address,
    pub creator_address: Address,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
    pub network: String,
}

/// Values read from a contract that passed ERC20 probing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Erc20Facts {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

/// Token facts sent to the external risk scorer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFacts {
    pub contract_address: String,
    pub creator_address: String,
    pub created_block_timestamp: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub blockchain: String,
}

impl TokenFacts {
    pub fn new(candidate: &Candidate, erc20: &Erc20Facts) -> Self {
        Self {
            contract_address: candidate.contract_address.to_checksum(None),
            creator_address: candidate.creator_address.to_checksum(None),
            created_block_timestamp: iso8601_from_unix(candidate.block_timestamp),
            name: erc20.name.clone(),
            symbol: erc20.symbol.clone(),
            decimals: erc20.decimals,
            blockchain: candidate.network.clone(),
        }
    }
}

/// Convert a block timestamp to ISO-8601 (UTC, millisecond precision).
/// Out-of-range values clamp to the epoch.
pub fn iso8601_from_unix(seconds: u64) -> String {
    let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
    DateTime::from_timestamp(seconds, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Verdict returned by the external risk scorer.
///
/// The scorer's output shape differs between deployments, so the verdict is kept
/// as a raw JSON object and read through tolerant accessors. A key holding `null`
/// counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskVerdict(Map<String, Value>);

impl RiskVerdict {
    /// Only JSON objects are verdicts
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Categorical field as text; numbers and booleans are stringified
    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// List field; a lone string is wrapped, anything else is empty
    pub fn list(&self, key: &str) -> Vec<Value> {
        as_list(self.get(key)).unwrap_or_default()
    }

    /// List field looked up at top level first, then inside `details`
    pub fn detail_list(&self, key: &str) -> Vec<Value> {
        as_list(self.get(key))
            .or_else(|| as_list(self.get("details").and_then(|d| d.get(key))))
            .unwrap_or_default()
    }

}

fn as_list(value: Option<&Value>) -> Option<Vec<Value>> {
    match value? {
        Value::Array(items) => Some(items.clone()),
        Value::String(s) if !s.trim().is_empty() => Some(vec![Value::String(s.clone())]),
        _ => None,
    }
}

/// Risk columns persisted alongside a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFields {
    pub risk_category: String,
    pub fraud_type: String,
    pub detection_details: Value,
}

/// The persisted entity, unique per (contract_address, blockchain)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub contract_address: String,
    pub creator_address: String,
    pub created_block_datetime: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub blockchain: String,
    #[serde(flatten)]
    pub risk: Option<RiskFields>,
}

impl TokenRecord {
    /// Natural key used by every store
    pub fn key(&self) -> (String, String) {
        (self.contract_address.to_lowercase(), self.blockchain.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_iso8601_from_unix() {
        assert_eq!(iso8601_from_unix(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(iso8601_from_unix(1_700_000_000), "2023-11-14T22:13:20.000Z");
        assert_eq!(iso8601_from_unix(u64::MAX), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_verdict_accessors_tolerate_shape_drift() {
        let verdict = RiskVerdict::from_value(json!({
            "risk_category": "  high  ",
            "fraud_type": null,
            "is_suspicious": "True",
            "risk_score": "85",
            "phishing_indicators": "urlshortener",
            "details": { "urls_found": ["bit.ly/x"] }
        }))
        .unwrap();

        assert_eq!(verdict.text("risk_category").as_deref(), Some("high"));
        assert_eq!(verdict.text("fraud_type"), None);
        assert_eq!(verdict.flag("is_suspicious"), Some(true));
        assert_eq!(verdict.number("risk_score"), Some(85.0));
        assert_eq!(verdict.list("phishing_indicators"), vec![json!("urlshortener")]);
        assert_eq!(verdict.detail_list("urls_found"), vec![json!("bit.ly/x")]);
        assert!(verdict.detail_list("money_amounts").is_empty());
    }

    #[test]
    fn test_verdict_rejects_non_objects() {
        assert!(RiskVerdict::from_value(json!([1, 2])).is_none());
        assert!(RiskVerdict::from_value(json!("high")).is_none());
    }

    #[test]
    fn test_record_without_risk_serializes_no_risk_columns() {
        let record = TokenRecord {
            contract_address: "0xAbC".to_string(),
            creator_address: "0xDeF".to_string(),
            created_block_datetime: iso8601_from_unix(0),
            name: "Foo".to_string(),
            symbol: "FOO".to_string(),
            decimals: 18,
            blockchain: "ethereum".to_string(),
            risk: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("risk_category"));
        assert!(!object.contains_key("risk"));
        assert_eq!(object["decimals"], json!(18));
        assert_eq!(record.key(), ("0xabc".to_string(), "ethereum".to_string()));
    }
}
