use thiserror::Error;

use crate::db_types::{Actor, NewUser, Role, UserAccount};

#[derive(Debug, Clone, Error)]
pub enum AuthApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The API key is not recognised")]
    InvalidApiKey,
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Organization {0} does not exist")]
    OrganizationNotFound(i64),
    #[error("A user with that email address already exists")]
    UserAlreadyExists,
    #[error("User is missing {0} of the requested roles")]
    RoleNotAllowed(usize),
    #[error("The requested role does not exist")]
    RoleNotFound,
}

impl From<sqlx::Error> for AuthApiError {
    fn from(e: sqlx::Error) -> Self {
        AuthApiError::DatabaseError(e.to_string())
    }
}

/// The `AuthManagement` trait defines behaviour for managing users and their roles.
///
/// ## Authentication
/// Users authenticate with an API key. Backends never see or store the key itself, only its hash, which is computed
/// by [`crate::AuthApi`]. A successful lookup resolves the hash to an [`Actor`]: the user, the organization they act
/// for, and their roles.
///
/// ## Authorisation
/// Roles are attached to users, not organizations. A user in a bank with the `Maker` role may prepare an issuance, but
/// it only executes once a `Checker` (or `Admin`) has approved it.
#[allow(async_fn_in_trait)]
pub trait AuthManagement {
    /// Creates the user and assigns the requested roles in one transaction. `User` is always assigned.
    async fn insert_user(&self, user: NewUser, api_key_hash: &str) -> Result<UserAccount, AuthApiError>;

    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserAccount>, AuthApiError>;

    async fn fetch_users_for_org(&self, org_id: i64) -> Result<Vec<UserAccount>, AuthApiError>;

    /// Resolves an API key hash to the user it belongs to. Unknown hashes give `Ok(None)`.
    async fn fetch_actor_for_key_hash(&self, api_key_hash: &str) -> Result<Option<Actor>, AuthApiError>;

    /// Fetches the roles for the given user. Unknown users have no roles.
    async fn fetch_roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, AuthApiError>;

    /// Checks whether a user holds **all** of the given roles. If any are missing,
    /// [`AuthApiError::RoleNotAllowed`] is returned with the number of missing roles.
    async fn check_user_has_roles(&self, user_id: i64, roles: &[Role]) -> Result<(), AuthApiError>;

    /// Assigns the given roles to the user. This function must be idempotent.
    async fn assign_roles(&self, user_id: i64, roles: &[Role]) -> Result<(), AuthApiError>;

    /// Removes the given roles from the user. The number of roles actually removed is returned. This function must be
    /// idempotent.
    async fn remove_roles(&self, user_id: i64, roles: &[Role]) -> Result<u64, AuthApiError>;

    /// The number of users holding the `Admin` role.
    async fn count_admins(&self) -> Result<i64, AuthApiError>;
}
