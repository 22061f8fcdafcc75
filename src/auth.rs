use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::attempts::{AttemptSnapshot, AttemptTracker};
use crate::error::{CoreError, CoreResult};
use crate::settings::{SETTINGS_KEY, SettingsStore};
use crate::store::{KeyValueStore, SecretStore};

/// Minimum password length, counted in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Fixed id of the password secret. Existence of this secret is the
/// "password configured" flag; there is no other credential state.
const PASSWORD_SECRET_ID: &str = "app-blocker.password";

/// Why a verification did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyFailure {
    /// No password has been configured yet.
    NoCredential,
}

/// Result of a password verification. A mismatch is an expected outcome,
/// not an error, so it travels as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub success: bool,
    pub reason: Option<VerifyFailure>,
}

impl VerifyOutcome {
    fn success() -> Self {
        Self {
            success: true,
            reason: None,
        }
    }

    fn mismatch() -> Self {
        Self {
            success: false,
            reason: None,
        }
    }

    fn no_credential() -> Self {
        Self {
            success: false,
            reason: Some(VerifyFailure::NoCredential),
        }
    }
}

/// One-way fingerprint of a security answer: trim, case-fold, SHA-256.
///
/// Recovery recomputes this over the supplied answer and compares; the
/// stored value is never reversed.
pub fn answer_fingerprint(answer: &str) -> String {
    let normalized = answer.trim().to_lowercase();

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Owns the password lifecycle and security-question recovery.
///
/// The secret store holds the password itself; the settings document holds
/// the recovery question and answer fingerprint; the attempt tracker is
/// updated as a side effect of every verification.
#[derive(Clone)]
pub struct CredentialManager {
    secrets: Arc<dyn SecretStore>,
    store: Arc<dyn KeyValueStore>,
    settings: SettingsStore,
    attempts: AttemptTracker,
}

impl CredentialManager {
    pub fn new(secrets: Arc<dyn SecretStore>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            secrets,
            settings: SettingsStore::new(store.clone()),
            attempts: AttemptTracker::new(store.clone()),
            store,
        }
    }

    /// True iff a password is currently configured.
    pub async fn has_credential(&self) -> CoreResult<bool> {
        Ok(self.secrets.get(PASSWORD_SECRET_ID).await?.is_some())
    }

    /// Store a new password, optionally together with a recovery question
    /// and answer. The question is only stored when both parts are given.
    /// Always clears the failed-attempt counter.
    pub async fn set_password(
        &self,
        password: &str,
        security: Option<(&str, &str)>,
    ) -> CoreResult<()> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CoreError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }

        self.secrets.set(PASSWORD_SECRET_ID, password).await?;

        if let Some((question, answer)) = security {
            let fingerprint = answer_fingerprint(answer);
            self.settings
                .update(|s| {
                    s.security_question = Some(question.to_string());
                    s.security_answer_hash = Some(fingerprint);
                })
                .await?;
        }

        self.attempts.clear().await?;
        Ok(())
    }

    /// Check a password against the stored secret.
    ///
    /// With no credential configured this returns the no-credential outcome
    /// without touching the attempt counter. Otherwise the comparison runs
    /// and its result is recorded — success resets the counter, failure
    /// increments it — before the outcome is returned.
    ///
    /// The stored secret is compared directly; the secret store is the
    /// protected container, so no second hashing layer is applied. The
    /// comparison itself is constant-time.
    pub async fn verify_password(&self, password: &str) -> CoreResult<VerifyOutcome> {
        let Some(stored) = self.secrets.get(PASSWORD_SECRET_ID).await? else {
            return Ok(VerifyOutcome::no_credential());
        };

        let success = bool::from(stored.as_bytes().ct_eq(password.as_bytes()));
        self.attempts.record(success).await?;

        if success {
            Ok(VerifyOutcome::success())
        } else {
            Ok(VerifyOutcome::mismatch())
        }
    }

    /// Replace the password after verifying the current one. The recovery
    /// question and answer are left untouched.
    pub async fn change_password(&self, old: &str, new: &str) -> CoreResult<()> {
        let outcome = self.verify_password(old).await?;
        if !outcome.success {
            return Err(CoreError::auth("current password is incorrect"));
        }

        self.set_password(new, None).await
    }

    /// Stored security question text, empty when none was configured.
    pub async fn security_question(&self) -> CoreResult<String> {
        Ok(self.settings.security_question().await?.unwrap_or_default())
    }

    /// Recover by answering the security question.
    ///
    /// Returns `false` on a wrong answer with no side effects — recovery
    /// failures are not login failures and leave the attempt counter alone.
    /// On a match the password is replaced (question preserved) and `true`
    /// is returned.
    pub async fn reset_password_with_answer(
        &self,
        answer: &str,
        new_password: &str,
    ) -> CoreResult<bool> {
        let Some(stored) = self.settings.security_answer_hash().await? else {
            return Err(CoreError::configuration(
                "security question has not been configured",
            ));
        };

        let candidate = answer_fingerprint(answer);
        if !bool::from(candidate.as_bytes().ct_eq(stored.as_bytes())) {
            return Ok(false);
        }

        self.set_password(new_password, None).await?;
        Ok(true)
    }

    /// Read-only view of the failed-attempt state.
    pub async fn failed_attempts(&self) -> CoreResult<AttemptSnapshot> {
        Ok(self.attempts.current().await?)
    }

    /// Full credential reset: deletes the password secret, the settings
    /// document (question, fingerprint, preferences) and the attempt count.
    pub async fn clear(&self) -> CoreResult<()> {
        self.secrets.clear(PASSWORD_SECRET_ID).await?;
        self.store
            .remove_many(&[SETTINGS_KEY, crate::attempts::FAILED_ATTEMPTS_KEY])
            .await?;
        Ok(())
    }
}
