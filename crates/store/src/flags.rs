//! Small named-key entities: feature flags, secrets, uploaders.
//!
//! These helpers read/write through whatever [`Datastore`] they are handed;
//! no global store handle is consulted.

use runboard_core::{Context, Key, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{Datastore, DatastoreExt};

/// An environment feature flag's default state.
///
/// The flag's name is the entity's key, not a stored field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    /// Flag name (the name key in the store).
    pub name: String,
    /// Whether the feature is enabled.
    pub enabled: bool,
}

/// A secret token accepted for test result uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// The secret value.
    pub secret: String,
}

/// A username/password combo accepted by the results receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uploader {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// Returns all feature flag defaults set in the store.
pub fn get_feature_flags(ctx: &Context, ds: &dyn Datastore) -> Result<Vec<Flag>> {
    let (keys, entities) = ds.get_all(ctx, ds.new_query("Flag"))?;
    Ok(keys
        .iter()
        .zip(entities)
        .map(|(key, entity)| Flag {
            name: key.name_id().to_string(),
            enabled: entity["enabled"].as_bool().unwrap_or(false),
        })
        .collect())
}

/// Returns true if a feature with the given flag name exists and is enabled.
pub fn is_feature_enabled(ctx: &Context, ds: &dyn Datastore, flag_name: &str) -> bool {
    let key = Key::name("Flag", flag_name);
    match ds.get(ctx, &key) {
        Ok(entity) => entity["enabled"].as_bool().unwrap_or(false),
        Err(_) => false,
    }
}

/// Puts a feature flag with the given name and enabled state.
pub fn set_feature(ctx: &Context, ds: &dyn Datastore, flag: &Flag) -> Result<()> {
    let key = Key::name("Flag", &flag.name);
    ds.put(ctx, &key, &json!({ "enabled": flag.enabled }))?;
    Ok(())
}

/// Loads a token's secret from the store by name.
pub fn get_secret(ctx: &Context, ds: &dyn Datastore, token_name: &str) -> Result<String> {
    let key = Key::name("Token", token_name);
    let token: Token = ds.get_as(ctx, &key)?;
    Ok(token.secret)
}

/// Gets the uploader with the given username.
pub fn get_uploader(ctx: &Context, ds: &dyn Datastore, uploader: &str) -> Result<Uploader> {
    let key = Key::name("Uploader", uploader);
    ds.get_as(ctx, &key)
}
