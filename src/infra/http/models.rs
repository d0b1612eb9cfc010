//! JSON request and response bodies.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::accounts::{
    DeleteAccountCommand, LoginCommand, ProfileCommand, RegisterCommand, SignedIn,
};
use crate::application::blog::PostCommand;
use crate::application::catalog::{CategoryCommand, ContactForm, ProductCommand};
use crate::domain::entities::{CategoryRecord, ProductRecord, UserRecord};

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    pub category_id: Uuid,
    pub price_minor: i64,
    #[serde(default)]
    pub is_published: Option<bool>,
}

impl From<ProductRequest> for ProductCommand {
    fn from(req: ProductRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            image: req.image,
            category_id: req.category_id,
            price_minor: req.price_minor,
            is_published: req.is_published,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PublicationRequest {
    pub ids: Vec<Uuid>,
    pub is_published: bool,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl From<CategoryRequest> for CategoryCommand {
    fn from(req: CategoryRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryListing {
    pub category: CategoryRecord,
    pub products: Vec<ProductRecord>,
}

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub phone: String,
    pub message: String,
}

impl From<ContactRequest> for ContactForm {
    fn from(req: ContactRequest) -> Self {
        Self {
            name: req.name,
            phone: req.phone,
            message: req.message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub is_published: Option<bool>,
}

impl From<PostRequest> for PostCommand {
    fn from(req: PostRequest) -> Self {
        Self {
            title: req.title,
            content: req.content,
            preview: req.preview,
            is_published: req.is_published,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub country: String,
}

impl From<RegisterRequest> for RegisterCommand {
    fn from(req: RegisterRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
            password_confirm: req.password_confirm,
            first_name: req.first_name,
            last_name: req.last_name,
            avatar: req.avatar,
            phone: req.phone,
            country: req.country,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl From<LoginRequest> for LoginCommand {
    fn from(req: LoginRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub country: String,
}

impl From<ProfileRequest> for ProfileCommand {
    fn from(req: ProfileRequest) -> Self {
        Self {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            avatar: req.avatar,
            phone: req.phone,
            country: req.country,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub agree: bool,
}

impl From<DeleteAccountRequest> for DeleteAccountCommand {
    fn from(req: DeleteAccountRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
            agree: req.agree,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserRecord,
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl From<SignedIn> for SessionResponse {
    fn from(signed_in: SignedIn) -> Self {
        Self {
            user: signed_in.user,
            token: signed_in.session.token,
            expires_at: signed_in.session.record.expires_at,
        }
    }
}
