//! Availability of mobile numbers and e-mail addresses.

use tracing::debug;

use crate::error::AppError;
use crate::model::owner::OwnerKind;
use crate::state::AppState;
use crate::store::Filter;
use crate::utils::contact_index::ContactField;

pub fn by_field(field: ContactField, value: &str) -> Filter {
    Filter::new().eq(field.as_ref(), field.normalize(value))
}

/// Is `value` already used by a user?
pub async fn user_has(state: &AppState, field: ContactField, value: &str) -> Result<bool, AppError> {
    if !state.contacts.might_exist(field, value) {
        return Ok(false);
    }
    if state.contacts.cached_owner(field, value).await == Some(OwnerKind::User) {
        return Ok(true);
    }

    let taken = state.users.find_one(&by_field(field, value)).await?.is_some();
    if taken {
        state.contacts.reassign(field, value, OwnerKind::User).await;
    }
    Ok(taken)
}

/// Who, if anyone, uses `value`. Users win over teachers.
pub async fn owner_of(
    state: &AppState,
    field: ContactField,
    value: &str,
) -> Result<Option<OwnerKind>, AppError> {
    if !state.contacts.might_exist(field, value) {
        debug!(%field, "Contact filter miss");
        return Ok(None);
    }
    if state.contacts.cached_owner(field, value).await == Some(OwnerKind::User) {
        return Ok(Some(OwnerKind::User));
    }

    let kind = holder(state, field, value).await?;
    if let Some(kind) = kind {
        state.contacts.reassign(field, value, kind).await;
    }
    Ok(kind)
}

/// Re-indexes `value` after an account stopped using it: whoever still holds
/// it takes over the cache entry, otherwise the value is dropped.
pub async fn release(state: &AppState, field: ContactField, value: &str) -> Result<(), AppError> {
    match holder(state, field, value).await? {
        Some(kind) => state.contacts.reassign(field, value, kind).await,
        None => state.contacts.forget(field, value).await,
    }
    Ok(())
}

async fn holder(
    state: &AppState,
    field: ContactField,
    value: &str,
) -> Result<Option<OwnerKind>, AppError> {
    let filter = by_field(field, value);
    if state.users.find_one(&filter).await?.is_some() {
        Ok(Some(OwnerKind::User))
    } else if state.teachers.find_one(&filter).await?.is_some() {
        Ok(Some(OwnerKind::Teacher))
    } else {
        Ok(None)
    }
}
