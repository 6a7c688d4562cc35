//! Tokio wrappers that move RSA and AES work onto the blocking pool, so a
//! large envelope never stalls the async executor.

use tokio::task;

use crate::decryptor::{HybridDecryptor, PlaintextObject};
use crate::encryptor::HybridEncryptor;
use crate::envelope::Envelope;
use crate::error::{DecryptError, EncryptError};

async fn run_blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match task::spawn_blocking(f).await {
        Ok(value) => value,
        Err(join) => std::panic::resume_unwind(join.into_panic()),
    }
}

pub async fn encrypt(encryptor: HybridEncryptor, plaintext: String) -> Result<Envelope, EncryptError> {
    run_blocking(move || encryptor.encrypt(&plaintext)).await
}

pub async fn decrypt(decryptor: HybridDecryptor, envelope: Envelope) -> Result<PlaintextObject, DecryptError> {
    run_blocking(move || decryptor.decrypt(&envelope)).await
}
