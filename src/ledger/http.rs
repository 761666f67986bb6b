//! HTTP ledger client
//!
//! The record-style endpoints (activation, settlement, balance) take
//! form-encoded posts and answer with positional label-prefixed records;
//! the withdrawal endpoints speak plain JSON. Reply parsing is tolerant:
//! missing record fields default rather than error, per the backend
//! convention.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;
use tracing::debug;

use super::{
    LedgerApi, LedgerError, SettlementReply, SettlementStatus, WithdrawalAccepted,
    WithdrawalProbe,
};
use crate::config::LedgerEndpoints;
use crate::core_types::{AccountRef, ActivationState};
use crate::wire::{self, PositionalRecord, STATUS_OK};

pub struct HttpLedgerClient {
    http: reqwest::Client,
    endpoints: LedgerEndpoints,
    asset_id: String,
}

impl HttpLedgerClient {
    pub fn new(http: reqwest::Client, endpoints: LedgerEndpoints, asset_id: impl Into<String>) -> Self {
        Self {
            http,
            endpoints,
            asset_id: asset_id.into(),
        }
    }

    async fn post_record(
        &self,
        url: &str,
        form: &[(&str, String)],
    ) -> Result<Value, LedgerError> {
        let body: Value = self
            .http
            .post(url)
            .form(form)
            .send()
            .await?
            .json()
            .await?;
        Ok(body)
    }
}

pub(super) fn parse_settlement_reply(
    body: &Value,
    asset_id: &str,
) -> Result<SettlementReply, LedgerError> {
    let record = PositionalRecord::decode(body)?;

    let message = record.labeled_or(0, "Message:", "No message");
    let status_code = record.labeled_or(1, "Status:", "Unknown");

    let status = if status_code == STATUS_OK {
        SettlementStatus::Success
    } else {
        SettlementStatus::Failed
    };

    Ok(SettlementReply {
        status,
        message,
        reference_rate: wire::reference_rate(body, asset_id),
    })
}

pub(super) fn parse_withdrawal_probe(body: &Value) -> WithdrawalProbe {
    WithdrawalProbe {
        success: body.get("success").and_then(Value::as_bool).unwrap_or(false),
        seqno_increased: body
            .get("seqnoIncreased")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        transaction_hash: body
            .get("transactionId")
            .and_then(|tx| tx.get("hash"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

#[async_trait]
impl LedgerApi for HttpLedgerClient {
    async fn check_activation(
        &self,
        account: &AccountRef,
    ) -> Result<ActivationState, LedgerError> {
        let body = self
            .post_record(
                &self.endpoints.activation_url,
                &[("address", account.to_string())],
            )
            .await?;

        let record = PositionalRecord::decode(&body)?;
        let status = record.labeled_or(1, "Status:", "Unknown");

        let state = if status == STATUS_OK {
            ActivationState::Activated
        } else {
            ActivationState::NotActivated
        };
        debug!(account = %account, status = %status, "Activation probe");
        Ok(state)
    }

    async fn report_settlement(
        &self,
        account: &AccountRef,
        fiat_amount: Decimal,
        chain_reference: &str,
    ) -> Result<SettlementReply, LedgerError> {
        let body = self
            .post_record(
                &self.endpoints.settlement_url,
                &[
                    ("address", account.to_string()),
                    ("amount", fiat_amount.to_string()),
                    ("hash", chain_reference.to_string()),
                ],
            )
            .await?;

        parse_settlement_reply(&body, &self.asset_id)
    }

    async fn initiate_withdrawal(
        &self,
        account: &AccountRef,
        native_amount: Decimal,
        fiat_amount: Decimal,
    ) -> Result<WithdrawalAccepted, LedgerError> {
        let body: Value = self
            .http
            .post(&self.endpoints.withdraw_url)
            .json(&serde_json::json!({
                "address": account.to_string(),
                "amount": native_amount.to_string(),
                "usdamount": fiat_amount.to_string(),
            }))
            .send()
            .await?
            .json()
            .await?;

        Ok(WithdrawalAccepted {
            success: body.get("success").and_then(Value::as_bool).unwrap_or(false),
            message: body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    async fn withdrawal_status(&self) -> Result<WithdrawalProbe, LedgerError> {
        let body: Value = self
            .http
            .get(&self.endpoints.withdraw_status_url)
            .send()
            .await?
            .json()
            .await?;

        Ok(parse_withdrawal_probe(&body))
    }

    async fn fiat_balance(&self, account: &AccountRef) -> Result<Decimal, LedgerError> {
        let body = self
            .post_record(
                &self.endpoints.balance_url,
                &[("address", account.to_string())],
            )
            .await?;

        // The balance endpoint answers with a bare number.
        body.as_f64()
            .and_then(Decimal::from_f64)
            .ok_or_else(|| LedgerError::Malformed(format!("balance is not a number: {body}")))
    }
}
