//! Middleware de autenticación JWT
//!
//! Verifica el bearer token, carga el perfil de profesor o alumno que indica
//! y lo inyecta en las extensions como [`Booker`].

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    services::Booker,
    state::AppState,
    utils::{
        errors::{AppError, AppResult},
        jwt::{extract_token_from_header, verify_token, Role},
    },
};

/// Middleware de autenticación JWT
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Token de autorización requerido".to_string()))?;

    let token = extract_token_from_header(auth_header)?;
    let claims = verify_token(token, &state.jwt())?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("ID de usuario inválido".to_string()))?;
    let booker = load_booker(&state, claims.role, claims.profile_uuid()?).await?;

    if booker.user_id() != user_id {
        return Err(AppError::Unauthorized(
            "El token no corresponde al perfil".to_string(),
        ));
    }

    request.extensions_mut().insert(booker);
    Ok(next.run(request).await)
}

async fn load_booker(state: &AppState, role: Role, profile_id: Uuid) -> AppResult<Booker> {
    let booker = match role {
        Role::Teacher => state.store.find_teacher(profile_id).await?.map(Booker::Teacher),
        Role::Student => state.store.find_student(profile_id).await?.map(Booker::Student),
    };
    booker.ok_or_else(|| AppError::Unauthorized("Usuario no encontrado".to_string()))
}
