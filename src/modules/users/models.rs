use serde::{Deserialize, Serialize};
use uuid::Uuid;
use yelpcamp_db::Document;
use yelpcamp_http::AppError;

use crate::utils::FieldErrors;

/// A registered account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Unique login name
    pub username: String,
    /// Unique contact address
    pub email: String,
    /// Argon2 PHC string; never rendered
    pub password_hash: String,
}

impl Document for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }
}

impl User {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
        }
    }

    /// What pages may show about the signed-in user
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }

    /// What pages may show about someone else
    pub fn author(&self) -> Author {
        Author {
            id: self.id.clone(),
            username: self.username.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// Author shown next to a campground or review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
}

/// Registration form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Registration input that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(self) -> Result<NewUser, AppError> {
        let mut errors = FieldErrors::new();
        let username = errors.required("username", &self.username);
        let email = errors.required("email", &self.email);
        if !email.is_empty() && !looks_like_email(&email) {
            errors.add("email", "email", "\"email\" must be a valid email");
        }
        if self.password.is_empty() {
            errors.add("password", "required", "\"password\" is required");
        }

        errors.finish(NewUser {
            username,
            email,
            password: self.password,
        })
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// Login form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}
