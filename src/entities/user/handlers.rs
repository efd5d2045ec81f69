//! Profile registration and self-service

use super::model::{Language, User};
use crate::app::AppState;
use crate::core::auth::AuthContext;
use crate::core::error::{DerlgResult, EntityError, ValidationError};
use crate::core::events::EntityEvent;
use crate::core::response::ApiResponse;
use crate::core::service::{find_or_404, DataService};
use crate::core::validation::{ValidatedJson, PHONE_RE};
use crate::payments::model::Currency;
use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(regex(path = *PHONE_RE))]
    pub phone: Option<String>,
    pub language: Option<Language>,
    pub currency: Option<Currency>,
    #[serde(default)]
    pub is_student: bool,
    #[validate(email)]
    pub student_email: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 50))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub last_name: Option<String>,
    #[validate(regex(path = *PHONE_RE))]
    pub phone: Option<String>,
    pub language: Option<Language>,
    pub currency: Option<Currency>,
    #[validate(url)]
    pub profile_image: Option<String>,
}

async fn email_taken(users: &dyn DataService<User>, email: &str, except: Option<Uuid>) -> DerlgResult<bool> {
    Ok(users
        .search("email", email)
        .await?
        .iter()
        .any(|u| u.deleted_at.is_none() && Some(u.id) != except))
}

/// Create the profile of the calling identity
pub async fn register(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> DerlgResult<ApiResponse<User>> {
    let user_id = auth.require_user()?;
    let role = auth.role().unwrap_or(crate::core::auth::Role::Tourist);

    if state.stores.users.get(&user_id).await?.is_some() {
        return Err(EntityError::AlreadyExists {
            entity_type: "user".to_string(),
            key: user_id.to_string(),
        }
        .into());
    }
    let email = request.email.trim().to_lowercase();
    if email_taken(state.stores.users.as_ref(), &email, None).await? {
        return Err(EntityError::AlreadyExists {
            entity_type: "user".to_string(),
            key: email,
        }
        .into());
    }
    if request.is_student && request.student_email.is_none() {
        return Err(ValidationError::field("student_email", "required for student accounts").into());
    }

    let mut user = User::new(user_id, role, email, request.first_name, request.last_name);
    user.phone = request.phone;
    user.language = request.language.unwrap_or_default();
    user.currency = request.currency.unwrap_or_default();
    user.is_student = request.is_student;
    user.student_email = request.student_email;
    let user = state.stores.users.create(user).await?;

    tracing::info!(user = %user.id, role = %role, "profile registered");
    state.events.publish(EntityEvent::Created {
        entity_type: "user".to_string(),
        entity_id: user.id,
        recipient_id: Some(user.id),
    });
    Ok(ApiResponse::created(user).with_message("Registration successful"))
}

pub async fn me(State(state): State<AppState>, auth: AuthContext) -> DerlgResult<ApiResponse<User>> {
    let user_id = auth.require_user()?;
    Ok(ApiResponse::ok(find_or_404(state.stores.users.as_ref(), &user_id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> DerlgResult<ApiResponse<User>> {
    let user_id = auth.require_user()?;
    let mut user = find_or_404(state.stores.users.as_ref(), &user_id).await?;

    if let Some(first_name) = request.first_name {
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = request.last_name {
        user.last_name = last_name.trim().to_string();
    }
    if request.phone.is_some() {
        user.phone = request.phone;
    }
    if let Some(language) = request.language {
        user.language = language;
    }
    if let Some(currency) = request.currency {
        user.currency = currency;
    }
    if request.profile_image.is_some() {
        user.profile_image = request.profile_image;
    }
    user.refresh_full_name();
    user.touch();

    let user = state.stores.users.update(&user_id, user).await?;
    tracing::debug!(user = %user_id, "profile updated");
    Ok(ApiResponse::ok(user).with_message("User profile updated successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::core::auth::Role;
    use axum::extract::State;

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            first_name: "Dara".to_string(),
            last_name: "Sok".to_string(),
            phone: None,
            language: Some(Language::Km),
            currency: None,
            is_student: false,
            student_email: None,
        }
    }

    #[tokio::test]
    async fn test_register_once_per_identity_and_email() {
        let state = AppState::in_memory(AppConfig::default());
        let id = Uuid::new_v4();
        let auth = AuthContext::user(id, Role::Tourist);

        let created = register(
            State(state.clone()),
            auth.clone(),
            ValidatedJson(register_request("Dara@Example.com")),
        )
        .await
        .unwrap();
        assert_eq!(created.data.email, "dara@example.com");
        assert_eq!(created.data.language, Language::Km);

        let again = register(State(state.clone()), auth, ValidatedJson(register_request("x@example.com")))
            .await
            .unwrap_err();
        assert_eq!(again.error_code(), "RES_3002");

        let other = AuthContext::user(Uuid::new_v4(), Role::Tourist);
        let dup = register(State(state), other, ValidatedJson(register_request("dara@example.com")))
            .await
            .unwrap_err();
        assert_eq!(dup.error_code(), "RES_3002");
    }

    #[tokio::test]
    async fn test_students_need_a_student_email() {
        let state = AppState::in_memory(AppConfig::default());
        let mut request = register_request("student@example.com");
        request.is_student = true;
        let err = register(
            State(state),
            AuthContext::user(Uuid::new_v4(), Role::Tourist),
            ValidatedJson(request),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "VAL_2001");
    }

    #[tokio::test]
    async fn test_update_profile_refreshes_name() {
        let state = AppState::in_memory(AppConfig::default());
        let id = Uuid::new_v4();
        let auth = AuthContext::user(id, Role::Tourist);
        register(State(state.clone()), auth.clone(), ValidatedJson(register_request("d@example.com")))
            .await
            .unwrap();

        let updated = update_profile(
            State(state),
            auth,
            ValidatedJson(UpdateProfileRequest {
                last_name: Some("Chan".to_string()),
                currency: Some(Currency::Khr),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.data.full_name, "Dara Chan");
        assert_eq!(updated.data.currency, Currency::Khr);
    }
}
