//! HTTP chain-state query
//!
//! Read-only lookup of an account's sequence number and last transaction
//! hash, keyed by address. Reply shape:
//!
//! ```text
//! { "result": { "seqno": <int>, "last_transaction_id": { "hash": <str> } } }
//! ```
//!
//! `seqno` arrives as either a number or a numeric string depending on the
//! gateway version; both are accepted.

use serde_json::Value;
use tracing::debug;

use super::{AccountState, ConnectorError};
use crate::core_types::AccountRef;

pub struct HttpChainQuery {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpChainQuery {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub async fn account_state(
        &self,
        account: &AccountRef,
    ) -> Result<AccountState, ConnectorError> {
        let url = format!("{}?address={}", self.endpoint, account);
        let body: Value = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ConnectorError::Connector(e.to_string()))?
            .json()
            .await
            .map_err(|e| ConnectorError::Connector(e.to_string()))?;

        let state = parse_account_state(&body)?;
        debug!(account = %account, seqno = state.sequence_number, "Fetched account state");
        Ok(state)
    }
}

fn parse_account_state(body: &Value) -> Result<AccountState, ConnectorError> {
    let result = body
        .get("result")
        .ok_or_else(|| ConnectorError::Connector("missing result field".to_string()))?;

    let sequence_number = match result.get("seqno") {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| ConnectorError::Connector("seqno out of range".to_string()))?,
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| ConnectorError::Connector(format!("unparseable seqno: {s:?}")))?,
        _ => return Err(ConnectorError::Connector("missing seqno".to_string())),
    };

    let last_tx_hash = result
        .get("last_transaction_id")
        .and_then(|tx| tx.get("hash"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(AccountState {
        sequence_number,
        last_tx_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_numeric_seqno() {
        let body = json!({
            "result": {
                "seqno": 17,
                "last_transaction_id": { "hash": "deadbeef" }
            }
        });
        let state = parse_account_state(&body).unwrap();
        assert_eq!(state.sequence_number, 17);
        assert_eq!(state.last_tx_hash, "deadbeef");
    }

    #[test]
    fn test_parse_string_seqno() {
        let body = json!({
            "result": {
                "seqno": "42",
                "last_transaction_id": { "hash": "cafe" }
            }
        });
        let state = parse_account_state(&body).unwrap();
        assert_eq!(state.sequence_number, 42);
    }

    #[test]
    fn test_parse_missing_hash_is_empty() {
        let body = json!({ "result": { "seqno": 3 } });
        let state = parse_account_state(&body).unwrap();
        assert_eq!(state.last_tx_hash, "");
    }

    #[test]
    fn test_parse_rejects_missing_result() {
        assert!(parse_account_state(&json!({ "ok": true })).is_err());
    }

    #[test]
    fn test_parse_rejects_garbage_seqno() {
        let body = json!({ "result": { "seqno": "not-a-number" } });
        assert!(parse_account_state(&body).is_err());
    }
}
