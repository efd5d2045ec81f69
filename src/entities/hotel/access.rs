//! Tenant checks: which hotel a caller may act on

use super::model::Hotel;
use crate::core::auth::AuthContext;
use crate::core::error::{AuthError, DerlgResult};
use crate::core::service::{DataService, find_or_404};
use uuid::Uuid;

/// The hotel managed by the calling hotel admin
pub async fn hotel_of_admin(
    hotels: &dyn DataService<Hotel>,
    auth: &AuthContext,
) -> DerlgResult<Hotel> {
    let user_id = auth.require_user()?;
    if !auth.is_hotel_admin() {
        return Err(AuthError::forbidden("hotel admin role required").into());
    }
    hotels
        .search("admin_id", &user_id.to_string())
        .await?
        .into_iter()
        .find(|h| h.deleted_at.is_none())
        .ok_or_else(|| AuthError::forbidden("no hotel is assigned to this admin").into())
}

/// Load `hotel_id` and check that the caller administers it
///
/// Super admins and internal services pass for every hotel.
pub async fn ensure_hotel_staff(
    hotels: &dyn DataService<Hotel>,
    auth: &AuthContext,
    hotel_id: Uuid,
) -> DerlgResult<Hotel> {
    if !auth.is_service() {
        auth.require_user()?;
    }
    let hotel = find_or_404(hotels, &hotel_id).await?;
    if auth.is_system() || is_admin_of(auth, &hotel) {
        Ok(hotel)
    } else {
        Err(AuthError::forbidden("not an administrator of this hotel").into())
    }
}

pub fn is_admin_of(auth: &AuthContext, hotel: &Hotel) -> bool {
    auth.is_hotel_admin() && auth.user_id() == Some(hotel.admin_id)
}
