//! Utilidades JWT
//!
//! Tokens HS256 con el usuario, su rol y el id de su perfil de profesor o
//! de alumno.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::environment::EnvironmentConfig, utils::errors::AppError};

/// Rol del usuario dentro de la autoescuela
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Teacher,
    Student,
}

/// Claims del JWT token
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,        // user_id
    pub role: Role,
    pub profile_id: String, // teacher_id o student_id
    pub exp: usize,
    pub iat: usize,
}

impl JwtClaims {
    pub fn profile_uuid(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.profile_id)
            .map_err(|_| AppError::Unauthorized("ID de perfil inválido".to_string()))
    }
}

/// Configuración de JWT
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration: u64,
}

impl From<&EnvironmentConfig> for JwtConfig {
    fn from(config: &EnvironmentConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            expiration: config.jwt_expiration,
        }
    }
}

/// Generar JWT token para un profesor o alumno
pub fn generate_token(
    user_id: Uuid,
    role: Role,
    profile_id: Uuid,
    config: &JwtConfig,
) -> Result<String, AppError> {
    let now = chrono::Utc::now();
    let expires_at = now + chrono::Duration::seconds(config.expiration as i64);

    let claims = JwtClaims {
        sub: user_id.to_string(),
        role,
        profile_id: profile_id.to_string(),
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("Error generando token: {}", e)))
}

/// Verificar y decodificar JWT token
pub fn verify_token(token: &str, config: &JwtConfig) -> Result<JwtClaims, AppError> {
    let token_data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Unauthorized(format!("Token inválido: {}", e)))?;

    Ok(token_data.claims)
}

/// Extraer token del header Authorization
pub fn extract_token_from_header(auth_header: &str) -> Result<&str, AppError> {
    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err(AppError::Unauthorized("Token no puede estar vacío".to_string())),
        None => Err(AppError::Unauthorized(
            "Header Authorization debe comenzar con 'Bearer '".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiration: 60,
        }
    }

    #[test]
    fn test_token_carries_role_and_profile() {
        let user = Uuid::new_v4();
        let profile = Uuid::new_v4();
        let token = generate_token(user, Role::Student, profile, &config()).unwrap();

        let claims = verify_token(&token, &config()).unwrap();
        assert_eq!(claims.sub, user.to_string());
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.profile_uuid().unwrap(), profile);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = generate_token(Uuid::new_v4(), Role::Teacher, Uuid::new_v4(), &config()).unwrap();
        let other = JwtConfig {
            secret: "other".to_string(),
            expiration: 60,
        };
        assert!(matches!(verify_token(&token, &other), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_token_from_header("Bearer abc").unwrap(), "abc");
        assert!(extract_token_from_header("Basic abc").is_err());
        assert!(extract_token_from_header("Bearer ").is_err());
    }
}
