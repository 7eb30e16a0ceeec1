//! REST Gateway
//!
//! `ReadGateway` + `WriteGateway` over a ledger fullnode's JSON API.

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::domain::AccountAddress;

use super::error::{GatewayError, GatewayResult};
use super::payload::{
    AccountResource, CommittedTransaction, PendingTransaction, SignedTransaction,
    TableItemRequest,
};
use super::traits::{ReadGateway, WriteGateway};

/// Characters escaped inside a path segment (struct tags keep their `::`)
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b',');

const NOT_FOUND_CODES: [&str; 3] = [
    "resource_not_found",
    "account_not_found",
    "table_item_not_found",
];

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    error_code: Option<String>,
}

/// Fullnode client
#[derive(Clone)]
pub struct RestGateway {
    client: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
}

impl RestGateway {
    pub fn new(base_url: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poll_interval,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.node_url.clone(),
            Duration::from_millis(config.poll_interval_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resource_url(&self, account: &AccountAddress, resource_type: &str) -> String {
        format!(
            "{}/accounts/{}/resource/{}",
            self.base_url,
            account,
            utf8_percent_encode(resource_type, PATH_SEGMENT)
        )
    }

    fn table_item_url(&self, handle: &str) -> String {
        format!(
            "{}/tables/{}/item",
            self.base_url,
            utf8_percent_encode(handle, PATH_SEGMENT)
        )
    }

    fn transaction_url(&self, hash: &str) -> String {
        format!(
            "{}/transactions/by_hash/{}",
            self.base_url,
            utf8_percent_encode(hash, PATH_SEGMENT)
        )
    }
}

/// Map a non-success response to a typed error
fn classify_error(status: u16, body: &str) -> GatewayError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
    let message = parsed
        .as_ref()
        .map(|b| b.message.clone())
        .unwrap_or_else(|| body.to_string());
    let code = parsed.as_ref().and_then(|b| b.error_code.as_deref());

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => GatewayError::NotFound(message),
        _ if status == 404 => GatewayError::NotFound(message),
        _ => GatewayError::Api { status, message },
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> GatewayResult<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(classify_error(status.as_u16(), &body));
    }
    resp.json::<T>()
        .await
        .map_err(|e| GatewayError::Decode(e.to_string()))
}

/// `None` while still pending, otherwise the final outcome
fn classify_transaction(hash: &str, txn: &Value) -> GatewayResult<Option<CommittedTransaction>> {
    if txn.get("type").and_then(Value::as_str) == Some("pending_transaction") {
        return Ok(None);
    }

    let success = txn
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| GatewayError::Decode(format!("transaction {} has no success flag", hash)))?;
    let vm_status = txn
        .get("vm_status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if !success {
        return Err(GatewayError::Rejected {
            hash: hash.to_string(),
            vm_status,
        });
    }

    let version = txn
        .get("version")
        .and_then(Value::as_str)
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    Ok(Some(CommittedTransaction {
        hash: hash.to_string(),
        version,
        vm_status,
    }))
}

#[async_trait]
impl ReadGateway for RestGateway {
    async fn get_account_resource(
        &self,
        account: &AccountAddress,
        resource_type: &str,
    ) -> GatewayResult<AccountResource> {
        let resp = self
            .client
            .get(self.resource_url(account, resource_type))
            .send()
            .await?;
        read_json(resp).await
    }

    async fn get_table_item(
        &self,
        handle: &str,
        request: &TableItemRequest,
    ) -> GatewayResult<Value> {
        let resp = self
            .client
            .post(self.table_item_url(handle))
            .json(request)
            .send()
            .await?;
        read_json(resp).await
    }
}

#[async_trait]
impl WriteGateway for RestGateway {
    async fn submit(&self, txn: &SignedTransaction) -> GatewayResult<PendingTransaction> {
        let resp = self
            .client
            .post(format!("{}/transactions", self.base_url))
            .json(&txn.body)
            .send()
            .await?;
        let pending: PendingTransaction = read_json(resp).await?;
        log::info!("submitted {} from {}", pending.hash, txn.sender);
        Ok(pending)
    }

    async fn wait_for_transaction(
        &self,
        pending: &PendingTransaction,
    ) -> GatewayResult<CommittedTransaction> {
        let url = self.transaction_url(&pending.hash);
        loop {
            let resp = self.client.get(&url).send().await?;
            // Freshly submitted transactions can briefly be unknown to the node
            if resp.status() != reqwest::StatusCode::NOT_FOUND {
                let txn: Value = read_json(resp).await?;
                if let Some(committed) = classify_transaction(&pending.hash, &txn)? {
                    return Ok(committed);
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gateway() -> RestGateway {
        RestGateway::new("https://node.example/v1/", Duration::from_millis(10))
    }

    #[test]
    fn test_base_url_is_trimmed() {
        assert_eq!(gateway().base_url(), "https://node.example/v1");
    }

    #[test]
    fn test_resource_url_keeps_struct_tag() {
        let account = AccountAddress::parse("0x1").unwrap();
        let url = gateway().resource_url(&account, "0x2::todolist::TodoList");
        assert_eq!(
            url,
            format!(
                "https://node.example/v1/accounts/{}/resource/0x2::todolist::TodoList",
                account
            )
        );
    }

    #[test]
    fn test_generic_type_is_escaped() {
        let account = AccountAddress::parse("0x1").unwrap();
        let coin_store = "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>";
        let url = gateway().resource_url(&account, coin_store);
        assert!(url.ends_with("CoinStore%3C0x1::aptos_coin::AptosCoin%3E"));
    }

    #[test]
    fn test_not_found_codes() {
        let body = r#"{"message":"Resource not found","error_code":"resource_not_found"}"#;
        assert!(classify_error(404, body).is_not_found());

        let body = r#"{"message":"Account not found","error_code":"account_not_found"}"#;
        assert!(classify_error(404, body).is_not_found());

        assert!(classify_error(404, "gone").is_not_found());
    }

    #[test]
    fn test_other_errors_keep_status() {
        let body = r#"{"message":"Invalid input","error_code":"invalid_input"}"#;
        assert_eq!(
            classify_error(400, body),
            GatewayError::Api {
                status: 400,
                message: "Invalid input".to_string()
            }
        );
        assert_eq!(
            classify_error(503, "upstream down"),
            GatewayError::Api {
                status: 503,
                message: "upstream down".to_string()
            }
        );
    }

    #[test]
    fn test_pending_transaction_keeps_waiting() {
        let txn = json!({"type": "pending_transaction", "hash": "0xabc"});
        assert_eq!(classify_transaction("0xabc", &txn).unwrap(), None);
    }

    #[test]
    fn test_committed_transaction() {
        let txn = json!({
            "type": "user_transaction",
            "version": "1024",
            "success": true,
            "vm_status": "Executed successfully"
        });
        let committed = classify_transaction("0xabc", &txn).unwrap().unwrap();
        assert_eq!(committed.version, 1024);
        assert_eq!(committed.vm_status, "Executed successfully");
    }

    #[test]
    fn test_failed_transaction_is_rejected() {
        let txn = json!({
            "type": "user_transaction",
            "version": "1025",
            "success": false,
            "vm_status": "Move abort in 0x2::todolist: ETASK_IS_COMPLETED(0x3): "
        });
        match classify_transaction("0xabc", &txn) {
            Err(GatewayError::Rejected { hash, vm_status }) => {
                assert_eq!(hash, "0xabc");
                assert!(vm_status.contains("ETASK_IS_COMPLETED"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
