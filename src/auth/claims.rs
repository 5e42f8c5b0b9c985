use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::RecordId;

/// Session token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: RecordId, // user ID
    pub iat: usize,    // issued at (unix timestamp)
    pub exp: usize,    // expires at (unix timestamp)
    pub iss: String,   // issuer
    pub aud: String,   // audience
    pub jti: Uuid,     // token ID, the key for a future denylist
}
