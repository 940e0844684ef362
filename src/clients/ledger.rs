use async_trait::async_trait;
use serde_json::{Value, json};
use sha3::{Digest, Keccak256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;

const MINT_SIGNATURE: &str = "mintCertificate(address,bytes32)";
const REVOKE_SIGNATURE: &str = "revokeCertificateByHash(bytes32)";
const VALIDITY_SIGNATURE: &str = "isHashValid(bytes32)";
const MINTED_EVENT_SIGNATURE: &str = "CertificateMinted(address,uint256,bytes32)";

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The RPC endpoint could not be reached or returned garbage.
    #[error("Ledger transport error: {0}")]
    Transport(String),

    /// The node understood the request and rejected it.
    #[error("Ledger rejected the call: {0}")]
    Rpc(String),

    #[error("Invalid input for ledger call: {0}")]
    InvalidInput(String),

    #[error("Transaction {0} was not mined before the receipt poll gave up")]
    ReceiptTimeout(String),
}

/// Outcome of a successful mint.
#[derive(Debug, Clone)]
pub struct MintReceipt {
    pub transaction_hash: String,

    pub token_id: String,
}

/// Client-side view of the pre-deployed credential contract.
///
/// Implementations are constructed at startup and injected wherever
/// ledger access is needed, so tests can substitute doubles.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Registers a certificate hash against the holder's wallet.
    async fn mint(&self, wallet: &str, certificate_hash: &str)
    -> Result<MintReceipt, LedgerError>;

    /// Revokes a previously minted hash. Returns the transaction hash.
    async fn revoke_by_hash(&self, certificate_hash: &str) -> Result<String, LedgerError>;

    /// True when the hash is anchored and not revoked.
    async fn validity(&self, certificate_hash: &str) -> Result<bool, LedgerError>;
}

/// JSON-RPC implementation talking to the node that hosts the contract.
///
/// Transactions are signed by the node (`eth_sendTransaction` with a
/// configured or discovered sender account), matching the dev-node
/// deployments the contract ships with. Calldata is assembled by hand:
/// Keccak-256 selector plus ABI-padded arguments.
pub struct EvmLedger {
    client: reqwest::Client,
    rpc_url: String,
    contract_address: String,
    sender_address: tokio::sync::OnceCell<String>,
    configured_sender: String,
    receipt_poll_attempts: u32,
    receipt_poll_interval_ms: u64,
}

impl EvmLedger {
    pub fn new(config: &LedgerConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        info!("Ledger client targeting contract {}", config.contract_address);

        Ok(Self {
            client,
            rpc_url: config.rpc_url.clone(),
            contract_address: config.contract_address.to_lowercase(),
            sender_address: tokio::sync::OnceCell::new(),
            configured_sender: config.sender_address.to_lowercase(),
            receipt_poll_attempts: config.receipt_poll_attempts,
            receipt_poll_interval_ms: config.receipt_poll_interval_ms,
        })
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::Transport(format!("Malformed RPC response: {e}")))?;

        if let Some(error) = payload.get("error")
            && !error.is_null()
        {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown RPC error");
            return Err(LedgerError::Rpc(message.to_string()));
        }

        Ok(payload.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Sender account for transactions: the configured address, or the
    /// node's first unlocked account on first use.
    async fn sender(&self) -> Result<String, LedgerError> {
        if !self.configured_sender.is_empty() {
            return Ok(self.configured_sender.clone());
        }

        self.sender_address
            .get_or_try_init(|| async {
                let accounts = self.rpc("eth_accounts", json!([])).await?;
                accounts
                    .as_array()
                    .and_then(|a| a.first())
                    .and_then(Value::as_str)
                    .map(|s| s.to_lowercase())
                    .ok_or_else(|| {
                        LedgerError::Rpc("Node exposes no unlocked accounts".to_string())
                    })
            })
            .await
            .cloned()
    }

    async fn send_transaction(&self, calldata: String) -> Result<String, LedgerError> {
        let from = self.sender().await?;

        let result = self
            .rpc(
                "eth_sendTransaction",
                json!([{
                    "from": from,
                    "to": self.contract_address,
                    "data": calldata,
                }]),
            )
            .await?;

        result
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| LedgerError::Rpc("eth_sendTransaction returned no hash".to_string()))
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<Value, LedgerError> {
        for _ in 0..self.receipt_poll_attempts {
            let receipt = self
                .rpc("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;

            if !receipt.is_null() {
                let status = receipt.get("status").and_then(Value::as_str).unwrap_or("0x1");
                if status == "0x0" {
                    return Err(LedgerError::Rpc(format!("Transaction {tx_hash} reverted")));
                }
                return Ok(receipt);
            }

            tokio::time::sleep(std::time::Duration::from_millis(self.receipt_poll_interval_ms))
                .await;
        }

        Err(LedgerError::ReceiptTimeout(tx_hash.to_string()))
    }
}

#[async_trait]
impl LedgerClient for EvmLedger {
    async fn mint(
        &self,
        wallet: &str,
        certificate_hash: &str,
    ) -> Result<MintReceipt, LedgerError> {
        let calldata = format!(
            "0x{}{}{}",
            hex::encode(selector(MINT_SIGNATURE)),
            encode_address(wallet)?,
            encode_bytes32(certificate_hash)?
        );

        debug!("Minting certificate hash {certificate_hash} to {wallet}");

        let tx_hash = self.send_transaction(calldata).await?;
        let receipt = self.wait_for_receipt(&tx_hash).await?;

        let token_id = extract_minted_token_id(&receipt).ok_or_else(|| {
            LedgerError::Rpc(format!(
                "CertificateMinted event not found in transaction {tx_hash}"
            ))
        })?;

        info!("Minted token {token_id} for hash {certificate_hash} (tx {tx_hash})");

        Ok(MintReceipt {
            transaction_hash: tx_hash,
            token_id,
        })
    }

    async fn revoke_by_hash(&self, certificate_hash: &str) -> Result<String, LedgerError> {
        let calldata = format!(
            "0x{}{}",
            hex::encode(selector(REVOKE_SIGNATURE)),
            encode_bytes32(certificate_hash)?
        );

        let tx_hash = self.send_transaction(calldata).await?;
        self.wait_for_receipt(&tx_hash).await?;

        info!("Revoked hash {certificate_hash} (tx {tx_hash})");
        Ok(tx_hash)
    }

    async fn validity(&self, certificate_hash: &str) -> Result<bool, LedgerError> {
        let calldata = format!(
            "0x{}{}",
            hex::encode(selector(VALIDITY_SIGNATURE)),
            encode_bytes32(certificate_hash)?
        );

        let result = self
            .rpc(
                "eth_call",
                json!([{
                    "to": self.contract_address,
                    "data": calldata,
                }, "latest"]),
            )
            .await?;

        let word = result.as_str().ok_or_else(|| {
            LedgerError::Rpc("eth_call returned a non-string result".to_string())
        })?;

        Ok(decode_bool(word))
    }
}

/// First four bytes of the Keccak-256 digest of the signature.
fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Keccak-256 of the full event signature (topic 0).
fn event_topic(signature: &str) -> String {
    format!("0x{}", hex::encode(Keccak256::digest(signature.as_bytes())))
}

/// Left-pads a 20-byte address into a 32-byte ABI word.
fn encode_address(address: &str) -> Result<String, LedgerError> {
    let stripped = address
        .strip_prefix("0x")
        .unwrap_or(address)
        .to_lowercase();

    if stripped.len() != 40 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(LedgerError::InvalidInput(format!(
            "'{address}' is not a 20-byte hex address"
        )));
    }

    Ok(format!("{:0>64}", stripped))
}

/// A 64-char hex digest used verbatim as a bytes32 word.
fn encode_bytes32(hash: &str) -> Result<String, LedgerError> {
    let stripped = hash.strip_prefix("0x").unwrap_or(hash).to_lowercase();

    if stripped.len() != 64 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(LedgerError::InvalidInput(format!(
            "'{hash}' is not a 32-byte hex digest"
        )));
    }

    Ok(stripped)
}

fn decode_bool(word: &str) -> bool {
    let stripped = word.strip_prefix("0x").unwrap_or(word);
    stripped.chars().any(|c| c != '0')
}

/// Pulls the token id out of the `CertificateMinted` log. The token id is
/// the second indexed argument; older contract builds emit it as the first
/// data word instead, so both locations are tried.
fn extract_minted_token_id(receipt: &Value) -> Option<String> {
    let topic0 = event_topic(MINTED_EVENT_SIGNATURE);

    let logs = receipt.get("logs")?.as_array()?;
    let log = logs.iter().find(|log| {
        log.get("topics")
            .and_then(Value::as_array)
            .and_then(|t| t.first())
            .and_then(Value::as_str)
            .is_some_and(|t| t.eq_ignore_ascii_case(&topic0))
    })?;

    let word = log
        .get("topics")
        .and_then(Value::as_array)
        .and_then(|t| t.get(2))
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .or_else(|| {
            log.get("data")
                .and_then(Value::as_str)
                .filter(|d| d.len() >= 2 + 64)
                .map(|d| format!("0x{}", &d[2..66]))
        })?;

    decode_uint(&word)
}

/// Decimal rendering of a 32-byte unsigned word. Token ids on these
/// contracts are sequential and comfortably fit u128.
fn decode_uint(word: &str) -> Option<String> {
    let stripped = word.strip_prefix("0x").unwrap_or(word);
    let trimmed = stripped.trim_start_matches('0');

    if trimmed.is_empty() {
        return Some("0".to_string());
    }

    u128::from_str_radix(trimmed, 16)
        .map(|v| v.to_string())
        .map_err(|e| {
            warn!("Token id exceeds u128: {e}");
            e
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_known_transfer_signature() {
        // Canonical ERC-20 transfer selector, a well-known vector.
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
    }

    #[test]
    fn encode_address_pads_to_a_word() {
        let encoded = encode_address("0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B").unwrap();
        assert_eq!(encoded.len(), 64);
        assert!(encoded.starts_with("000000000000000000000000ab5801a7"));
    }

    #[test]
    fn encode_address_rejects_short_input() {
        assert!(encode_address("0x1234").is_err());
        assert!(encode_address("not-hex").is_err());
    }

    #[test]
    fn encode_bytes32_requires_full_digest() {
        let digest = "ab".repeat(32);
        assert_eq!(encode_bytes32(&digest).unwrap(), digest);
        assert!(encode_bytes32("abcd").is_err());
    }

    #[test]
    fn decode_bool_reads_last_word() {
        let yes = format!("0x{:0>64}", "1");
        let no = format!("0x{:0>64}", "0");
        assert!(decode_bool(&yes));
        assert!(!decode_bool(&no));
    }

    #[test]
    fn decode_uint_trims_leading_zeros() {
        let word = format!("0x{:0>64}", "2a");
        assert_eq!(decode_uint(&word).unwrap(), "42");
        let zero = format!("0x{:0>64}", "0");
        assert_eq!(decode_uint(&zero).unwrap(), "0");
    }

    #[test]
    fn token_id_extracted_from_indexed_topic() {
        let topic0 = event_topic(MINTED_EVENT_SIGNATURE);
        let receipt = serde_json::json!({
            "status": "0x1",
            "logs": [{
                "topics": [
                    topic0,
                    format!("0x{:0>64}", "ab"),
                    format!("0x{:0>64}", "7"),
                ],
                "data": "0x",
            }],
        });

        assert_eq!(extract_minted_token_id(&receipt).unwrap(), "7");
    }

    #[test]
    fn token_id_falls_back_to_data_word() {
        let topic0 = event_topic(MINTED_EVENT_SIGNATURE);
        let receipt = serde_json::json!({
            "status": "0x1",
            "logs": [{
                "topics": [topic0],
                "data": format!("0x{:0>64}", "1f"),
            }],
        });

        assert_eq!(extract_minted_token_id(&receipt).unwrap(), "31");
    }

    #[test]
    fn unrelated_logs_are_ignored() {
        let receipt = serde_json::json!({
            "status": "0x1",
            "logs": [{
                "topics": [format!("0x{:0>64}", "dead")],
                "data": format!("0x{:0>64}", "1"),
            }],
        });

        assert!(extract_minted_token_id(&receipt).is_none());
    }
}
