use serde::{Deserialize, Serialize};

use crate::auth::repo_types::User;
use crate::ids::RecordId;
use crate::validation::{Field, RequestSchema, Rule, Schema, Shape};

/// `POST /auth/google`
#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    pub body: GoogleLoginBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginBody {
    pub id_token: String,
}

impl RequestSchema for GoogleLoginRequest {
    fn schema() -> Schema {
        Schema::new().body(Shape::new([
            Field::string("idToken").rule(Rule::MinLength(1))
        ]))
    }
}

/// `POST /auth/register`
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub body: RegisterBody,
}

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RequestSchema for RegisterRequest {
    fn schema() -> Schema {
        Schema::new().body(Shape::new([
            Field::string("name")
                .trimmed()
                .rule(Rule::MinLength(1))
                .rule(Rule::MaxLength(100)),
            Field::string("email").trimmed().rule(Rule::MinLength(1)),
            Field::string("password")
                .rule(Rule::MinLength(8))
                .rule(Rule::MaxLength(128)),
        ]))
    }
}

/// `POST /auth/login`
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub body: LoginBody,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

impl RequestSchema for LoginRequest {
    fn schema() -> Schema {
        Schema::new().body(Shape::new([
            Field::string("email").trimmed().rule(Rule::MinLength(1)),
            Field::string("password").rule(Rule::MinLength(1)),
        ]))
    }
}

/// Response returned after any successful login or registration.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: RecordId,
    pub name: String,
    pub email: String,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
        }
    }
}
