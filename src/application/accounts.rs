//! Email-based accounts: registration, login, profile and role seeding.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand_core::OsRng;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::notify::{MailIdentity, Mailer, deliver_best_effort, welcome_mail};
use crate::application::repos::{CreateUserParams, RepoError, UpdateProfileParams, UsersRepo};
use crate::application::sessions::{IssuedSession, SessionError, SessionService};
use crate::domain::actor::{
    Actor, PRODUCT_MODERATOR_GROUP, PRODUCT_MODERATOR_PERMISSIONS, Permission,
};
use crate::domain::entities::UserRecord;
use crate::domain::error::DomainError;
use crate::domain::policy::{AccessDenied, Gate, authorize_actor};
use crate::domain::validation::{
    COUNTRY_MAX_CHARS, ValidationErrors, check_email, check_image_reference, check_max_chars,
    check_phone, check_required, normalize_email,
};

const EMAIL_TAKEN: &str = "A user with this email already exists.";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Access(#[from] AccessDenied),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account is inactive")]
    Inactive,
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl From<ValidationErrors> for AccountError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Domain(DomainError::Validation(errors))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterCommand {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub phone: String,
    pub country: String,
}

#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileCommand {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub phone: String,
    pub country: String,
}

#[derive(Debug, Clone)]
pub struct DeleteAccountCommand {
    pub email: String,
    pub password: String,
    pub agree: bool,
}

#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: UserRecord,
    pub session: IssuedSession,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: SessionService,
    mailer: Arc<dyn Mailer>,
    identity: MailIdentity,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: SessionService,
        mailer: Arc<dyn Mailer>,
        identity: MailIdentity,
    ) -> Self {
        Self {
            users,
            sessions,
            mailer,
            identity,
        }
    }

    pub async fn register(&self, cmd: RegisterCommand) -> Result<SignedIn, AccountError> {
        let email = normalize_email(&cmd.email);
        let avatar = non_blank(cmd.avatar);
        let phone = cmd.phone.trim().to_string();
        let country = cmd.country.trim().to_string();

        let mut errors = ValidationErrors::new();
        check_email(&mut errors, "email", &email);
        check_required(&mut errors, "password", &cmd.password);
        if cmd.password != cmd.password_confirm {
            errors.add("password_confirm", "Passwords do not match.");
        }
        check_phone(&mut errors, "phone", &phone);
        check_max_chars(&mut errors, "country", &country, COUNTRY_MAX_CHARS);
        check_image_reference(&mut errors, "avatar", avatar.as_deref());
        if errors.get("email").is_none() && self.users.find_by_email(&email).await?.is_some() {
            errors.add("email", EMAIL_TAKEN);
        }
        errors.into_result()?;

        let password_hash = hash_password(&cmd.password)?;
        let user = self
            .users
            .create_user(CreateUserParams {
                email,
                password_hash,
                first_name: cmd.first_name.trim().to_string(),
                last_name: cmd.last_name.trim().to_string(),
                avatar,
                phone,
                country,
                is_staff: false,
                is_superuser: false,
            })
            .await
            .map_err(duplicate_email)?;

        let session = self.sessions.issue(user.id).await?;
        deliver_best_effort(
            self.mailer.as_ref(),
            "welcome",
            welcome_mail(&user, &self.identity.from),
        )
        .await;

        info!(target = "skystore::accounts", user_id = %user.id, "user registered");
        Ok(SignedIn { user, session })
    }

    pub async fn login(&self, cmd: LoginCommand) -> Result<SignedIn, AccountError> {
        let email = normalize_email(&cmd.email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(&cmd.password, &user.password_hash) {
            return Err(AccountError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AccountError::Inactive);
        }

        let session = self.sessions.issue(user.id).await?;
        info!(target = "skystore::accounts", user_id = %user.id, "user logged in");
        Ok(SignedIn { user, session })
    }

    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        Ok(self.sessions.revoke(token).await?)
    }

    /// Any failure along token → session → active user yields the anonymous actor.
    pub async fn resolve_actor(&self, token: Option<&str>) -> Actor {
        let Some(token) = token else {
            return Actor::anonymous();
        };
        match self.try_resolve(token).await {
            Ok(actor) => actor,
            Err(err) => {
                debug!(
                    target = "skystore::accounts",
                    error = %err,
                    "session token rejected"
                );
                Actor::anonymous()
            }
        }
    }

    async fn try_resolve(&self, token: &str) -> Result<Actor, AccountError> {
        let session = self.sessions.authenticate(token).await?;
        let user = self
            .users
            .find_user(session.user_id)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;
        if !user.is_active {
            return Err(AccountError::Inactive);
        }
        let permissions = self.users.effective_permissions(user.id).await?;
        Ok(Actor::for_user(&user, permissions))
    }

    pub async fn profile(&self, actor: &Actor) -> Result<UserRecord, AccountError> {
        let user_id = self.require_user(actor)?;
        self.users
            .find_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user").into())
    }

    pub async fn update_profile(
        &self,
        actor: &Actor,
        cmd: ProfileCommand,
    ) -> Result<UserRecord, AccountError> {
        let user_id = self.require_user(actor)?;
        let email = normalize_email(&cmd.email);
        let avatar = non_blank(cmd.avatar);
        let phone = cmd.phone.trim().to_string();
        let country = cmd.country.trim().to_string();

        let mut errors = ValidationErrors::new();
        check_email(&mut errors, "email", &email);
        check_phone(&mut errors, "phone", &phone);
        check_max_chars(&mut errors, "country", &country, COUNTRY_MAX_CHARS);
        check_image_reference(&mut errors, "avatar", avatar.as_deref());
        if errors.get("email").is_none()
            && let Some(existing) = self.users.find_by_email(&email).await?
            && existing.id != user_id
        {
            errors.add("email", EMAIL_TAKEN);
        }
        errors.into_result()?;

        let user = self
            .users
            .update_profile(
                user_id,
                UpdateProfileParams {
                    email,
                    first_name: cmd.first_name.trim().to_string(),
                    last_name: cmd.last_name.trim().to_string(),
                    avatar,
                    phone,
                    country,
                },
            )
            .await
            .map_err(duplicate_email)?;

        info!(target = "skystore::accounts", user_id = %user.id, "profile updated");
        Ok(user)
    }

    pub async fn delete_account(
        &self,
        actor: &Actor,
        cmd: DeleteAccountCommand,
    ) -> Result<(), AccountError> {
        let user = self.profile(actor).await?;

        let mut errors = ValidationErrors::new();
        if normalize_email(&cmd.email) != user.email {
            errors.add("email", "Email does not match your account.");
        }
        if !verify_password(&cmd.password, &user.password_hash) {
            errors.add("password", "Incorrect password.");
        }
        if !cmd.agree {
            errors.add("agree", "Confirm that you want to delete your account.");
        }
        errors.into_result()?;

        self.sessions.revoke_all(user.id).await?;
        self.users.delete_user(user.id).await?;
        info!(target = "skystore::accounts", user_id = %user.id, "account deleted");
        Ok(())
    }

    pub async fn create_superuser(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserRecord, AccountError> {
        let email = normalize_email(email);
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, "email", &email);
        check_required(&mut errors, "password", password);
        errors.into_result()?;

        let user = self
            .users
            .create_user(CreateUserParams {
                email,
                password_hash: hash_password(password)?,
                first_name: String::new(),
                last_name: String::new(),
                avatar: None,
                phone: String::new(),
                country: String::new(),
                is_staff: true,
                is_superuser: true,
            })
            .await
            .map_err(duplicate_email)?;

        info!(target = "skystore::accounts", user_id = %user.id, "superuser created");
        Ok(user)
    }

    /// Create or refresh the built-in permission groups.
    pub async fn seed_roles(&self) -> Result<(), AccountError> {
        self.users
            .upsert_group(PRODUCT_MODERATOR_GROUP, PRODUCT_MODERATOR_PERMISSIONS)
            .await?;
        info!(
            target = "skystore::accounts",
            group = PRODUCT_MODERATOR_GROUP,
            "permission group seeded"
        );
        Ok(())
    }

    /// Put an existing user into a seeded permission group.
    pub async fn assign_group(&self, email: &str, group: &str) -> Result<UserRecord, AccountError> {
        let user = self.user_by_email(email).await?;
        let group = group.trim();
        match self.users.add_to_group(user.id, group).await {
            Ok(()) => {}
            Err(RepoError::NotFound) => {
                return Err(
                    ValidationErrors::single("group", format!("Unknown group: {group}.")).into(),
                );
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            target = "skystore::accounts",
            user_id = %user.id,
            group,
            "user added to permission group"
        );
        Ok(user)
    }

    /// Grant one named permission directly to an existing user.
    pub async fn grant_permission(
        &self,
        email: &str,
        codename: &str,
    ) -> Result<UserRecord, AccountError> {
        let codename = codename.trim();
        let permission: Permission = codename.parse().map_err(|()| {
            ValidationErrors::single("permission", format!("Unknown permission: {codename}."))
        })?;
        let user = self.user_by_email(email).await?;
        self.users.grant_permission(user.id, permission).await?;

        info!(
            target = "skystore::accounts",
            user_id = %user.id,
            permission = %permission,
            "permission granted"
        );
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> Result<UserRecord, AccountError> {
        self.users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| DomainError::not_found("user").into())
    }

    fn require_user(&self, actor: &Actor) -> Result<Uuid, AccountError> {
        authorize_actor(actor, &[Gate::LoginRequired])?;
        actor
            .id
            .ok_or_else(|| AccessDenied { gate: Gate::LoginRequired }.into())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn duplicate_email(err: RepoError) -> AccountError {
    match err {
        RepoError::Duplicate { .. } => ValidationErrors::single("email", EMAIL_TAKEN).into(),
        other => other.into(),
    }
}

pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AccountError::Hashing(err.to_string()))
}

/// Unparseable hashes never verify.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
