//! Who may see and act on a booking

use super::model::Booking;
use crate::core::auth::AuthContext;
use crate::core::error::{AuthError, DerlgResult};
use crate::entities::hotel::access::ensure_hotel_staff;
use crate::storage::Stores;

/// The guest, the admin of the booked hotel, or a super admin
pub async fn ensure_can_view(stores: &Stores, auth: &AuthContext, booking: &Booking) -> DerlgResult<()> {
    let user_id = if auth.is_service() { None } else { Some(auth.require_user()?) };
    if auth.is_system() || user_id.is_some_and(|id| booking.is_owned_by(id)) {
        return Ok(());
    }
    if auth.is_hotel_admin() {
        ensure_hotel_staff(stores.hotels.as_ref(), auth, booking.hotel_id).await?;
        return Ok(());
    }
    Err(AuthError::forbidden("not allowed to access this booking").into())
}

/// The guest or a super admin
pub fn ensure_owner(auth: &AuthContext, booking: &Booking) -> DerlgResult<()> {
    if auth.is_system() {
        return Ok(());
    }
    let user_id = auth.require_user()?;
    if booking.is_owned_by(user_id) {
        Ok(())
    } else {
        Err(AuthError::forbidden("only the guest can change this booking").into())
    }
}
