//! Typed access to Smart-Kill resources.

use tracing::debug;

use crate::client::Client;
use crate::decoder::ResponseDecoder;
use crate::error::Error;
use crate::models::{Activity, MobileApp, Operator, Profile, Resource, Trap, User};
use crate::schema::{Entity, UnknownFields};

/// Resource-level API on top of an authenticating [`Client`].
///
/// Every call issues a single authenticated GET and decodes the body with the
/// instance's unknown-field policy.
#[derive(Debug)]
pub struct Api {
    client: Client,
    decoder: ResponseDecoder,
}

impl Api {
    /// Wrap a client; unknown response fields are rejected.
    pub fn new(client: Client) -> Self {
        Self::with_unknown_fields(client, UnknownFields::default())
    }

    pub fn with_unknown_fields(client: Client, unknown: UnknownFields) -> Self {
        Self {
            client,
            decoder: ResponseDecoder::new(unknown),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// List every entity of a collection.
    pub async fn get_all<T: Resource>(&self) -> Result<Vec<T>, Error> {
        self.get_list(&T::collection_path()).await
    }

    pub async fn get_by_id<T: Resource>(&self, id: u64) -> Result<T, Error> {
        self.get_by_url(&T::item_path(id)).await
    }

    /// Fetch a single entity from a path relative to the base URL, or from an absolute URL.
    pub async fn get_by_url<T: Entity>(&self, url: &str) -> Result<T, Error> {
        let body = self.client.get_json(url).await?;
        Ok(self.decoder.decode(&body)?)
    }

    async fn get_list<T: Entity>(&self, path: &str) -> Result<Vec<T>, Error> {
        let body = self.client.get_json(path).await?;
        let items: Vec<T> = self.decoder.decode_list(&body)?;
        debug!(path, count = items.len(), "Fetched list");
        Ok(items)
    }

    // Activity logs

    pub async fn get_activity_logs(&self) -> Result<Vec<Activity>, Error> {
        self.get_all().await
    }

    pub async fn get_activity_log_record(&self, log_record_id: u64) -> Result<Activity, Error> {
        self.get_by_id(log_record_id).await
    }

    pub async fn get_activity_log_by_url(&self, url: &str) -> Result<Activity, Error> {
        self.get_by_url(url).await
    }

    // Mobile apps

    pub async fn get_mobile_apps(&self) -> Result<Vec<MobileApp>, Error> {
        self.get_all().await
    }

    pub async fn get_mobile_app_by_id(&self, app_id: u64) -> Result<MobileApp, Error> {
        self.get_by_id(app_id).await
    }

    pub async fn get_mobile_app_by_url(&self, url: &str) -> Result<MobileApp, Error> {
        self.get_by_url(url).await
    }

    // Operators

    pub async fn get_operators(&self) -> Result<Vec<Operator>, Error> {
        self.get_all().await
    }

    pub async fn get_operator_by_id(&self, operator_id: u64) -> Result<Operator, Error> {
        self.get_by_id(operator_id).await
    }

    pub async fn get_operator_by_url(&self, url: &str) -> Result<Operator, Error> {
        self.get_by_url(url).await
    }

    // Profiles

    pub async fn get_profiles(&self) -> Result<Vec<Profile>, Error> {
        self.get_all().await
    }

    pub async fn get_profile_by_id(&self, profile_id: u64) -> Result<Profile, Error> {
        self.get_by_id(profile_id).await
    }

    pub async fn get_profile_by_url(&self, url: &str) -> Result<Profile, Error> {
        self.get_by_url(url).await
    }

    // Traps

    pub async fn get_traps(&self) -> Result<Vec<Trap>, Error> {
        self.get_all().await
    }

    pub async fn get_trap_by_id(&self, trap_id: u64) -> Result<Trap, Error> {
        self.get_by_id(trap_id).await
    }

    pub async fn get_trap_by_url(&self, url: &str) -> Result<Trap, Error> {
        self.get_by_url(url).await
    }

    /// Activity records of one trap, oldest first as served.
    pub async fn get_trap_history(&self, trap_id: u64) -> Result<Vec<Activity>, Error> {
        self.get_list(&format!("{}history/", Trap::item_path(trap_id)))
            .await
    }

    // Users

    pub async fn get_users(&self) -> Result<Vec<User>, Error> {
        self.get_all().await
    }

    pub async fn get_user_by_id(&self, user_id: u64) -> Result<User, Error> {
        self.get_by_id(user_id).await
    }

    pub async fn get_user_by_url(&self, url: &str) -> Result<User, Error> {
        self.get_by_url(url).await
    }
}
