// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile and credentials)
//! - User keys (login key -> user ID, enforces uniqueness)
//! - Sessions (keyed by token hash)

use super::{collections, SessionStore, UserStore};
use crate::error::AppError;
use crate::models::{LoginKey, Session, User, UserDocument};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use serde::{Deserialize, Serialize};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Index document mapping a login key to its user.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserKeyDocument {
    user_id: String,
    created_at: String,
}

/// Stored session; carries its own key so expired sessions can be deleted
/// from a query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionDocument {
    key: String,
    user_id: String,
    created_at: String,
    expires_at: String,
}

impl SessionDocument {
    fn new(key: &str, session: &Session) -> Self {
        Self {
            key: key.to_string(),
            user_id: session.user_id.clone(),
            created_at: session.created_at.clone(),
            expires_at: session.expires_at.clone(),
        }
    }
}

impl From<SessionDocument> for Session {
    fn from(doc: SessionDocument) -> Self {
        Session {
            user_id: doc.user_id,
            created_at: doc.created_at,
            expires_at: doc.expires_at,
        }
    }
}

fn store_error(e: FirestoreError) -> AppError {
    AppError::StoreUnavailable(e.to_string())
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // With the emulator, skip real credentials entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client for testing.
    ///
    /// All database operations will return `StoreUnavailable`.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::StoreUnavailable("Database not connected (offline mode)".to_string())
        })
    }

    async fn delete_user_key(&self, storage_key: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USER_KEYS)
            .document_id(storage_key)
            .execute()
            .await
            .map_err(store_error)
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete(&self, doc_ids: &[String], collection: &str) -> Result<(), AppError> {
        let client = self.get_client()?;

        for chunk in doc_ids.chunks(BATCH_SIZE) {
            let mut transaction = client.begin_transaction().await.map_err(|e| {
                AppError::StoreUnavailable(format!("Failed to begin transaction: {}", e))
            })?;

            for doc_id in chunk {
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::StoreUnavailable(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::StoreUnavailable(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

// ─── User Operations ─────────────────────────────────────────

#[async_trait]
impl UserStore for FirestoreDb {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let doc: Option<UserDocument> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await
            .map_err(store_error)?;

        doc.map(User::try_from)
            .transpose()
            .map_err(|e| AppError::Internal(e.into()))
    }

    async fn find_by_login_key(&self, key: &LoginKey) -> Result<Option<User>, AppError> {
        let index: Option<UserKeyDocument> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_KEYS)
            .obj()
            .one(&key.storage_key())
            .await
            .map_err(store_error)?;

        match index {
            Some(index) => self.get_user(&index.user_id).await,
            None => Ok(None),
        }
    }

    /// Claims the login key first with an insert (which fails if the key
    /// document exists), then writes the user. If the user write fails the
    /// key is released again.
    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let client = self.get_client()?;
        let storage_key = user.login_key().storage_key();

        let index = UserKeyDocument {
            user_id: user.id.clone(),
            created_at: format_utc_rfc3339(Utc::now()),
        };

        let claimed: Result<UserKeyDocument, FirestoreError> = client
            .fluent()
            .insert()
            .into(collections::USER_KEYS)
            .document_id(&storage_key)
            .object(&index)
            .execute()
            .await;

        match claimed {
            Ok(_) => {}
            Err(FirestoreError::DataConflictError(_)) => {
                return Err(AppError::Conflict(storage_key));
            }
            Err(e) => return Err(store_error(e)),
        }

        let doc = UserDocument::from(user);
        let written: Result<UserDocument, FirestoreError> = client
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(&doc)
            .execute()
            .await;

        if let Err(e) = written {
            tracing::error!(
                user_id = %user.id,
                error = %e,
                "Failed to write user, releasing login key"
            );
            if let Err(cleanup) = self.delete_user_key(&storage_key).await {
                tracing::error!(error = %cleanup, key = %storage_key, "Failed to release login key");
            }
            return Err(store_error(e));
        }

        tracing::debug!(user_id = %user.id, "User document created");
        Ok(())
    }
}

// ─── Session Operations ──────────────────────────────────────

#[async_trait]
impl SessionStore for FirestoreDb {
    async fn put_session(&self, key: &str, session: &Session) -> Result<(), AppError> {
        let doc = SessionDocument::new(key, session);
        let _: SessionDocument = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SESSIONS)
            .document_id(key)
            .object(&doc)
            .execute()
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn get_session(&self, key: &str) -> Result<Option<Session>, AppError> {
        let doc: Option<SessionDocument> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SESSIONS)
            .obj()
            .one(key)
            .await
            .map_err(store_error)?;
        Ok(doc.map(Session::from))
    }

    async fn delete_session(&self, key: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::SESSIONS)
            .document_id(key)
            .execute()
            .await
            .map_err(store_error)
    }

    /// `expires_at` is always written by `format_utc_rfc3339`, so string
    /// ordering matches time ordering.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let cutoff = format_utc_rfc3339(now);

        let expired: Vec<SessionDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SESSIONS)
            .filter(|q| q.for_all([q.field("expires_at").less_than(cutoff.clone())]))
            .obj()
            .query()
            .await
            .map_err(store_error)?;

        let keys: Vec<String> = expired.into_iter().map(|doc| doc.key).collect();
        self.batch_delete(&keys, collections::SESSIONS).await?;

        tracing::debug!(count = keys.len(), "Purged expired sessions");
        Ok(keys.len())
    }
}
