use serde::{Deserialize, Serialize};

/// Claims carried by the bearer tokens the auth provider issues
#[derive(Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}
