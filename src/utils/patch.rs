use chrono::NaiveDateTime;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::auth::password::hash_password;
use crate::error::AppError;
use crate::store::StoreError;
use crate::utils::contact_index::ContactField;

/// Checks a partial-update payload: a non-empty JSON object that touches
/// none of the `protected` fields.
pub fn validate_patch(
    payload: Value,
    protected: &[&str],
) -> Result<Map<String, Value>, AppError> {
    let Value::Object(fields) = payload else {
        return Err(AppError::validation("Payload must be a JSON object"));
    };

    if fields.is_empty() {
        return Err(AppError::validation("No fields provided for update"));
    }

    if let Some(field) = fields.keys().find(|k| protected.contains(&k.as_str())) {
        return Err(AppError::validation(format!("Field `{field}` cannot be updated")));
    }

    Ok(fields)
}

/// Turns a create payload into document fields: drops the fields only the
/// service may write and stamps `createdAt`/`updatedAt`.
pub fn new_document(
    payload: Value,
    protected: &[&str],
    now: NaiveDateTime,
) -> Result<Map<String, Value>, AppError> {
    let Value::Object(mut fields) = payload else {
        return Err(AppError::validation("Payload must be a JSON object"));
    };

    fields.retain(|k, _| !protected.contains(&k.as_str()));
    let stamp = serde_json::to_value(now).map_err(StoreError::from)?;
    fields.insert("createdAt".to_string(), stamp.clone());
    fields.insert("updatedAt".to_string(), stamp);
    Ok(fields)
}

/// Replaces a plain-text `password` field with its argon2 hash.
pub fn hash_password_field(fields: &mut Map<String, Value>) -> Result<(), AppError> {
    let Some(value) = fields.get_mut("password") else {
        return Ok(());
    };
    let plain = value
        .as_str()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("Password must be a non-empty string"))?;

    *value = Value::String(hash_password(plain)?);
    Ok(())
}

/// Rewrites `mobile` and `email` into their stored form.
pub fn normalize_contact_fields(fields: &mut Map<String, Value>) {
    for field in [ContactField::Mobile, ContactField::Email] {
        if let Some(Value::String(value)) = fields.get_mut(field.as_ref()) {
            *value = field.normalize(value);
        }
    }
}

/// Decodes document fields into `T`; shape errors become validation errors.
pub fn decode_document<T: DeserializeOwned>(fields: Map<String, Value>) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| AppError::validation(format!("Invalid document: {e}")))
}

/// Overlays `fields` onto `doc` at the top level and decodes the result.
/// A `null` clears optional fields; a value of the wrong shape is a
/// validation error and leaves `doc` untouched.
pub fn merge_patch<T>(doc: &T, fields: &Map<String, Value>) -> Result<T, AppError>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(doc).map_err(StoreError::from)?;
    if let Value::Object(target) = &mut value {
        for (key, field) in fields {
            target.insert(key.clone(), field.clone());
        }
    }

    serde_json::from_value(value)
        .map_err(|e| AppError::validation(format!("Invalid field value: {e}")))
}
