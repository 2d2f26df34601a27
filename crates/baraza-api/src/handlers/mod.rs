//! Request handlers, one module per resource.

pub mod auth;
pub mod enrollment;
pub mod quiz;
pub mod sessions;
pub mod voting;

use baraza_core::user::Principal;

use crate::error::ApiError;

/// Participant-facing operations: participants themselves, plus admins.
pub fn require_participant(principal: &Principal) -> Result<(), ApiError> {
  if principal.role == baraza_core::user::Role::Participant
    || principal.role.is_admin()
  {
    Ok(())
  } else {
    Err(ApiError::Forbidden(
      "this operation is for session participants".into(),
    ))
  }
}

/// Facilitator/admin operations.
pub fn require_manager(principal: &Principal) -> Result<(), ApiError> {
  if principal.role.can_manage_sessions() {
    Ok(())
  } else {
    Err(ApiError::Forbidden(
      "facilitator or admin role required".into(),
    ))
  }
}

/// Admin-only operations.
pub fn require_admin(principal: &Principal) -> Result<(), ApiError> {
  if principal.role.is_admin() {
    Ok(())
  } else {
    Err(ApiError::Forbidden("admin role required".into()))
  }
}
