//! EVM ledger backend.
//!
//! Implements the ledger trait seams over the confidential registry
//! contract. Read calls go through an unauthenticated provider; writes
//! require the configured signing key. Revert reasons are pattern-matched
//! to distinguish the benign already-verified condition from genuine
//! submission failures.

#![allow(clippy::too_many_arguments)]

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, FixedBytes, B256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::{CiphertextHandle, Record, RecordId, SealedValue};
use crate::infra::{
    CreateRecordTx, LedgerRead, LedgerWrite, PendingTransaction, RegistryError, Result, TxReceipt,
    ALREADY_VERIFIED_REASON,
};

// Generate contract bindings
sol! {
    #[sol(rpc)]
    interface IDonationRegistry {
        function createBusinessData(
            string id,
            string name,
            bytes32 encryptedValue,
            bytes proof,
            uint32 publicValue1,
            uint32 publicValue2,
            string description
        ) external;

        function verifyDecryption(string id, bytes clearValues, bytes proof) external;

        function getAllBusinessIds() external view returns (string[]);

        function getBusinessData(string id) external view returns (
            string name,
            string description,
            uint32 publicValue1,
            uint32 publicValue2,
            bool isVerified,
            uint64 decryptedValue,
            address creator,
            uint64 timestamp
        );

        function getEncryptedValue(string id) external view returns (bytes32);

        function isAvailable() external view returns (bool);
    }
}

/// Ledger connection configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// RPC URL for the chain.
    pub rpc_url: String,
    /// Registry contract address.
    pub contract_address: Address,
    /// Private key for signing transactions; absent for read-only use.
    pub private_key: Option<String>,
    /// How long to wait for finalization before reporting timeout.
    pub confirm_timeout: Duration,
    /// Receipt poll interval.
    pub poll_interval: Duration,
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let rpc_url = std::env::var("REGISTRY_RPC_URL")
            .unwrap_or_else(|_| "http://localhost:8545".to_string());

        let contract_address = std::env::var("REGISTRY_CONTRACT_ADDRESS")
            .map_err(|_| {
                RegistryError::Configuration("REGISTRY_CONTRACT_ADDRESS is not set".to_string())
            })?
            .parse()
            .map_err(|e| {
                RegistryError::Configuration(format!("invalid contract address: {}", e))
            })?;

        let private_key = std::env::var("REGISTRY_PRIVATE_KEY").ok();

        let confirm_timeout = std::env::var("REGISTRY_CONFIRM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(90));

        Ok(Self {
            rpc_url,
            contract_address,
            private_key,
            confirm_timeout,
            poll_interval: Duration::from_secs(2),
        })
    }
}

/// EVM implementation of the ledger views.
pub struct EvmLedger {
    config: LedgerConfig,
    signer_address: Option<Address>,
}

impl EvmLedger {
    /// Read-only view; no signing identity required.
    pub fn read_only(config: LedgerConfig) -> Self {
        Self {
            config,
            signer_address: None,
        }
    }

    /// Signer-bound view; fails fast when no key is configured.
    pub fn with_signer(config: LedgerConfig) -> Result<Self> {
        let signer = Self::parse_signer(&config)?;
        let signer_address = signer.address();
        info!(signer = %signer_address, contract = %config.contract_address, "Ledger signer configured");
        Ok(Self {
            config,
            signer_address: Some(signer_address),
        })
    }

    fn parse_signer(config: &LedgerConfig) -> Result<PrivateKeySigner> {
        config
            .private_key
            .as_deref()
            .ok_or_else(|| RegistryError::NotReady("no signing identity configured".to_string()))?
            .parse()
            .map_err(|e| RegistryError::Configuration(format!("invalid private key: {}", e)))
    }

    fn rpc_url(&self) -> Result<url::Url> {
        self.config
            .rpc_url
            .parse()
            .map_err(|e| RegistryError::Configuration(format!("invalid RPC URL: {}", e)))
    }

    fn pending(&self, tx_hash: B256) -> Box<dyn PendingTransaction> {
        Box::new(EvmPendingTx {
            rpc_url: self.config.rpc_url.clone(),
            tx_hash,
            confirm_timeout: self.config.confirm_timeout,
            poll_interval: self.config.poll_interval,
        })
    }
}

/// Map a write-path error message onto the submission taxonomy.
fn classify_submission_error(message: &str, id: &RecordId) -> RegistryError {
    if message.contains(ALREADY_VERIFIED_REASON) {
        return RegistryError::AlreadyVerified(id.clone());
    }
    let lowered = message.to_lowercase();
    if lowered.contains("user rejected") || lowered.contains("rejected the request") {
        return RegistryError::SubmissionRejected(message.to_string());
    }
    RegistryError::SubmissionFailed(message.to_string())
}

fn load_error(e: impl std::fmt::Display) -> RegistryError {
    RegistryError::LoadFailed(e.to_string())
}

fn to_timestamp(secs: u64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs as i64, 0).unwrap_or_else(Utc::now)
}

#[async_trait]
impl LedgerRead for EvmLedger {
    async fn is_available(&self) -> Result<bool> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url()?);
        let contract = IDonationRegistry::new(self.config.contract_address, &provider);
        let result = contract.isAvailable().call().await.map_err(load_error)?;
        Ok(result._0)
    }

    async fn list_record_ids(&self) -> Result<Vec<RecordId>> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url()?);
        let contract = IDonationRegistry::new(self.config.contract_address, &provider);
        let result = contract.getAllBusinessIds().call().await.map_err(load_error)?;
        Ok(result._0.into_iter().map(RecordId).collect())
    }

    async fn get_record(&self, id: &RecordId) -> Result<Record> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url()?);
        let contract = IDonationRegistry::new(self.config.contract_address, &provider);
        let data = contract
            .getBusinessData(id.as_str().to_string())
            .call()
            .await
            .map_err(load_error)?;

        let value = if data.isVerified {
            SealedValue::Revealed {
                clear_value: data.decryptedValue,
            }
        } else {
            SealedValue::Sealed
        };

        Ok(Record {
            id: id.clone(),
            name: data.name,
            description: data.description,
            public_value1: data.publicValue1,
            public_value2: data.publicValue2,
            value,
            creator: data.creator.to_string(),
            created_at: to_timestamp(data.timestamp),
        })
    }

    async fn get_ciphertext_handle(&self, id: &RecordId) -> Result<CiphertextHandle> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url()?);
        let contract = IDonationRegistry::new(self.config.contract_address, &provider);
        let result = contract
            .getEncryptedValue(id.as_str().to_string())
            .call()
            .await
            .map_err(load_error)?;
        Ok(CiphertextHandle(result._0.0))
    }
}

#[async_trait]
impl LedgerWrite for EvmLedger {
    fn signer_address(&self) -> String {
        self.signer_address
            .map(|a| a.to_string())
            .unwrap_or_default()
    }

    async fn create_record(&self, tx: CreateRecordTx) -> Result<Box<dyn PendingTransaction>> {
        let signer = Self::parse_signer(&self.config)?;
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(self.rpc_url()?);
        let contract = IDonationRegistry::new(self.config.contract_address, &provider);

        let call = contract.createBusinessData(
            tx.id.as_str().to_string(),
            tx.name,
            FixedBytes::from(*tx.handle.as_bytes()),
            Bytes::from(tx.input_proof),
            tx.public_value1,
            tx.public_value2,
            tx.description,
        );

        let pending = call
            .send()
            .await
            .map_err(|e| classify_submission_error(&e.to_string(), &tx.id))?;

        let tx_hash = *pending.tx_hash();
        info!(record_id = %tx.id, tx_hash = %tx_hash, "Record creation submitted");
        Ok(self.pending(tx_hash))
    }

    async fn submit_decryption_proof(
        &self,
        id: &RecordId,
        abi_clear_values: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<Box<dyn PendingTransaction>> {
        let signer = Self::parse_signer(&self.config)?;
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(self.rpc_url()?);
        let contract = IDonationRegistry::new(self.config.contract_address, &provider);

        let call = contract.verifyDecryption(
            id.as_str().to_string(),
            Bytes::from(abi_clear_values),
            Bytes::from(proof),
        );

        let pending = call
            .send()
            .await
            .map_err(|e| classify_submission_error(&e.to_string(), id))?;

        let tx_hash = *pending.tx_hash();
        info!(record_id = %id, tx_hash = %tx_hash, "Decryption proof submitted");
        Ok(self.pending(tx_hash))
    }
}

/// A submitted transaction awaiting finalization.
struct EvmPendingTx {
    rpc_url: String,
    tx_hash: B256,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

#[async_trait]
impl PendingTransaction for EvmPendingTx {
    async fn confirm(self: Box<Self>) -> Result<TxReceipt> {
        let url: url::Url = self
            .rpc_url
            .parse()
            .map_err(|e| RegistryError::Configuration(format!("invalid RPC URL: {}", e)))?;
        let provider = ProviderBuilder::new().on_http(url);

        let wait_for_receipt = async {
            loop {
                match provider.get_transaction_receipt(self.tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {
                        debug!(tx_hash = %self.tx_hash, "Transaction not yet finalized");
                    }
                    Err(e) => {
                        debug!(tx_hash = %self.tx_hash, error = %e, "Receipt poll failed");
                    }
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        let receipt = tokio::time::timeout(self.confirm_timeout, wait_for_receipt)
            .await
            .map_err(|_| RegistryError::TransactionTimeout {
                seconds: self.confirm_timeout.as_secs(),
            })?;

        if !receipt.status() {
            return Err(RegistryError::TransactionReverted(format!(
                "transaction {} reverted in block {}",
                receipt.transaction_hash,
                receipt.block_number.unwrap_or(0)
            )));
        }

        Ok(TxReceipt {
            tx_hash: receipt.transaction_hash.to_string(),
            block_number: receipt.block_number,
        })
    }
}
