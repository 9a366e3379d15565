//! Encryption gateway.
//!
//! Wraps the opaque encryption capability behind a process-wide context
//! that must be initialized exactly once per session. Initialization is
//! single-flight: concurrent attempts coalesce onto one backend `init`
//! call and re-initialization after success is a no-op.
//!
//! Decryption is a two-phase protocol: `prepare_decryption` obtains the
//! clear values and a proof of correct decryption off-chain; the caller
//! then submits that bundle to the ledger and interprets the result. The
//! intermediate `ProofBundle` is inspectable and independently testable.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

use crate::domain::CiphertextHandle;
use crate::infra::{
    EncryptedInput, EncryptionBackend, ProofBundle, RegistryError, Result,
};

/// Nonce size for AES-GCM.
const NONCE_SIZE: usize = 12;

/// Gateway over the process-wide encryption context.
pub struct EncryptionGateway {
    backend: Arc<dyn EncryptionBackend>,
    /// Contract the ciphertexts are bound to.
    target_contract: String,
    init: OnceCell<()>,
}

impl EncryptionGateway {
    pub fn new(backend: Arc<dyn EncryptionBackend>, target_contract: impl Into<String>) -> Self {
        Self {
            backend,
            target_contract: target_contract.into(),
            init: OnceCell::new(),
        }
    }

    /// Initialize the encryption context. Safe to call concurrently and
    /// repeatedly; only the first caller reaches the backend.
    pub async fn initialize(&self) -> Result<()> {
        self.init
            .get_or_try_init(|| async {
                tracing::info!(contract = %self.target_contract, "Initializing encryption context");
                self.backend.init().await
            })
            .await?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.init.initialized()
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(RegistryError::EncryptionUnavailable)
        }
    }

    /// Encrypt a plaintext integer for the target contract on behalf of
    /// the requesting identity. Must not be called before `initialize`
    /// has completed.
    pub async fn encrypt(&self, requester: &str, value: u64) -> Result<EncryptedInput> {
        self.ensure_initialized()?;
        self.backend
            .encrypt_u64(&self.target_contract, requester, value)
            .await
    }

    /// Off-chain half of the reveal: clear values plus a decryption proof
    /// for the given handles.
    pub async fn prepare_decryption(&self, handles: &[CiphertextHandle]) -> Result<ProofBundle> {
        self.ensure_initialized()?;
        self.backend
            .prepare_decryption(handles, &self.target_contract)
            .await
    }
}

/// Development/test backend sealing values with AES-256-GCM.
///
/// Handles are the SHA-256 of the sealed blob; `prepare_decryption` opens
/// the blob back up and proves it with a digest over the bundle. This is a
/// stand-in capability for local runs, not an implementation of the
/// homomorphic scheme.
#[derive(Clone)]
pub struct LocalBackend {
    key: [u8; 32],
    sealed: Arc<RwLock<HashMap<CiphertextHandle, Vec<u8>>>>,
    init_calls: Arc<AtomicUsize>,
    encrypt_calls: Arc<AtomicUsize>,
    decrypt_calls: Arc<AtomicUsize>,
}

impl LocalBackend {
    pub fn new() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self {
            key,
            sealed: Arc::new(RwLock::new(HashMap::new())),
            init_calls: Arc::new(AtomicUsize::new(0)),
            encrypt_calls: Arc::new(AtomicUsize::new(0)),
            decrypt_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn encrypt_calls(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    fn seal(&self, value: u64) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| RegistryError::EncryptionFailed(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, value.to_be_bytes().as_slice())
            .map_err(|e| RegistryError::EncryptionFailed(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    fn open(&self, blob: &[u8]) -> Result<u64> {
        if blob.len() < NONCE_SIZE {
            return Err(RegistryError::EncryptionFailed(
                "sealed blob too short".to_string(),
            ));
        }
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| RegistryError::EncryptionFailed(e.to_string()))?;
        let nonce = Nonce::from_slice(&blob[..NONCE_SIZE]);

        let plaintext = cipher
            .decrypt(nonce, &blob[NONCE_SIZE..])
            .map_err(|e| RegistryError::EncryptionFailed(e.to_string()))?;

        let bytes: [u8; 8] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| RegistryError::EncryptionFailed("unexpected plaintext width".to_string()))?;
        Ok(u64::from_be_bytes(bytes))
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EncryptionBackend for LocalBackend {
    async fn init(&self) -> Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn encrypt_u64(
        &self,
        target_contract: &str,
        requester: &str,
        value: u64,
    ) -> Result<EncryptedInput> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);

        let blob = self.seal(value)?;

        let mut hasher = Sha256::new();
        hasher.update(b"sealed-registry/handle");
        hasher.update(&blob);
        let handle = CiphertextHandle(hasher.finalize().into());

        let mut proof_hasher = Sha256::new();
        proof_hasher.update(b"sealed-registry/input-proof");
        proof_hasher.update(target_contract.as_bytes());
        proof_hasher.update(requester.as_bytes());
        proof_hasher.update(handle.as_bytes());
        let proof = proof_hasher.finalize().to_vec();

        self.sealed.write().await.insert(handle, blob.clone());

        Ok(EncryptedInput {
            handle,
            ciphertext: blob,
            proof,
        })
    }

    async fn prepare_decryption(
        &self,
        handles: &[CiphertextHandle],
        target_contract: &str,
    ) -> Result<ProofBundle> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);

        let sealed = self.sealed.read().await;
        let mut clear_values = Vec::with_capacity(handles.len());
        let mut abi_clear_values = Vec::with_capacity(handles.len() * 32);

        for handle in handles {
            let blob = sealed.get(handle).ok_or_else(|| {
                RegistryError::EncryptionFailed(format!("unknown ciphertext handle: {}", handle))
            })?;
            let value = self.open(blob)?;
            clear_values.push((*handle, value));

            // One 32-byte big-endian word per value, abi.encode(uint64) layout.
            let mut word = [0u8; 32];
            word[24..32].copy_from_slice(&value.to_be_bytes());
            abi_clear_values.extend_from_slice(&word);
        }

        let mut proof_hasher = Sha256::new();
        proof_hasher.update(b"sealed-registry/decryption-proof");
        proof_hasher.update(target_contract.as_bytes());
        for handle in handles {
            proof_hasher.update(handle.as_bytes());
        }
        proof_hasher.update(&abi_clear_values);
        let proof = proof_hasher.finalize().to_vec();

        Ok(ProofBundle {
            clear_values,
            abi_clear_values,
            proof,
        })
    }
}
