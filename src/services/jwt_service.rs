use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::models::user::Claims;

// Signs a token for the user, valid for one day. The auth provider issues
// these in production; the service only needs it for tooling and tests.
pub fn create_jwt(user_id: Uuid, secret_key: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(1)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret_key.as_bytes()),
    )
}

// Validates the provided JWT token and returns the user ID if valid.
pub fn validate_token(token: &str, secret_key: &str) -> Option<Uuid> {
    let validation = Validation::new(Algorithm::HS256);

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret_key.as_bytes()),
        &validation,
    ) {
        Ok(data) => Uuid::parse_str(&data.claims.sub).ok(),
        Err(_) => None,
    }
}
