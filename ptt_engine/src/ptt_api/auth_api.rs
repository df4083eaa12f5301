//! User creation, API-key authentication and role management.
//!
//! API keys are random 32-byte strings handed out exactly once, when the user is created. Only their SHA-256 hash is
//! ever stored, so a lost key cannot be recovered, only replaced by a new user.
use std::fmt::{Debug, Write};

use log::*;
use ptt_common::Secret;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::{
    db_types::{Actor, NewUser, Role, UserAccount},
    traits::{AuthApiError, AuthManagement},
};

pub const API_KEY_PREFIX: &str = "ptt_";

pub struct AuthApi<B> {
    db: B,
}

impl<B: Debug> Debug for AuthApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthApi ({:?})", self.db)
    }
}

impl<B> AuthApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// A fresh, random API key.
pub fn generate_api_key() -> Secret<String> {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    Secret::new(format!("{API_KEY_PREFIX}{}", to_hex(&bytes)))
}

/// Hex-encoded SHA-256 of the key. This is what the backend stores and looks up.
pub fn hash_api_key(api_key: &str) -> String {
    to_hex(&Sha256::digest(api_key.trim().as_bytes()))
}

impl<B> AuthApi<B>
where B: AuthManagement
{
    /// Creates the user and returns the only copy of their API key.
    pub async fn create_user(&self, user: NewUser) -> Result<(UserAccount, Secret<String>), AuthApiError> {
        let api_key = generate_api_key();
        let account = self.db.insert_user(user, &hash_api_key(api_key.reveal())).await?;
        info!("🔑️ User #{} created in org #{}", account.id, account.org_id);
        Ok((account, api_key))
    }

    /// Resolves an API key to the user and organization it acts for.
    pub async fn authenticate(&self, api_key: &str) -> Result<Actor, AuthApiError> {
        match self.db.fetch_actor_for_key_hash(&hash_api_key(api_key)).await? {
            Some(actor) => {
                debug!("🔑️ User #{} authenticated for org #{}", actor.user_id, actor.org_id);
                Ok(actor)
            },
            None => {
                warn!("🔑️ Authentication attempt with an unknown API key");
                Err(AuthApiError::InvalidApiKey)
            },
        }
    }

    pub async fn fetch_user(&self, user_id: i64) -> Result<Option<UserAccount>, AuthApiError> {
        self.db.fetch_user(user_id).await
    }

    pub async fn users_for_org(&self, org_id: i64) -> Result<Vec<UserAccount>, AuthApiError> {
        self.db.fetch_users_for_org(org_id).await
    }

    pub async fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, AuthApiError> {
        self.db.fetch_roles_for_user(user_id).await
    }

    pub async fn check_user_has_roles(&self, user_id: i64, roles: &[Role]) -> Result<(), AuthApiError> {
        self.db.check_user_has_roles(user_id, roles).await
    }

    pub async fn assign_roles(&self, user_id: i64, roles: &[Role]) -> Result<(), AuthApiError> {
        self.db.assign_roles(user_id, roles).await?;
        info!("🔑️ Roles {roles:?} assigned to user #{user_id}");
        Ok(())
    }

    pub async fn remove_roles(&self, user_id: i64, roles: &[Role]) -> Result<u64, AuthApiError> {
        let removed = self.db.remove_roles(user_id, roles).await?;
        info!("🔑️ {removed} roles removed from user #{user_id}");
        Ok(removed)
    }

    /// True when nobody holds the `Admin` role, i.e. on a fresh database.
    pub async fn needs_bootstrap(&self) -> Result<bool, AuthApiError> {
        Ok(self.db.count_admins().await? == 0)
    }
}
