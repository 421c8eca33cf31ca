//! Zones

use super::fetcher::{self, encode_segment, require_id, ListRequest, ListStyle};
use crate::api::client::Session;
use crate::engine::pagination::{Paginated, TotalPages};
use crate::error::Error;
use crate::types::{ZoneStatus, ZoneType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Reference to an owning account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<ZoneStatus>,
    #[serde(rename = "type", default)]
    pub zone_type: Option<ZoneType>,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub name_servers: Vec<String>,
    #[serde(default)]
    pub account: Option<AccountRef>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_on: Option<DateTime<Utc>>,
}

/// Filters for [`ZonesApi::list`]
#[derive(Debug, Clone, Default)]
pub struct ZoneFilter {
    pub name: Option<String>,
    pub status: Option<ZoneStatus>,
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateZone {
    pub name: String,
    pub account: AccountId,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub zone_type: Option<ZoneType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountId {
    pub id: String,
}

/// Zone endpoints
#[derive(Debug)]
pub struct ZonesApi {
    session: Arc<Session>,
}

impl ZonesApi {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// List zones visible to the token
    pub fn list(&self, filter: &ZoneFilter, cancel: CancellationToken) -> Paginated<'static, Zone> {
        let request = ListRequest::new(
            "zones".to_string(),
            ListStyle::Numbered(TotalPages::Reliable),
        )
        .filter("name", filter.name.as_deref())
        .filter("status", filter.status.as_ref())
        .filter("account.id", filter.account_id.as_deref());

        fetcher::list(&self.session, request, cancel)
    }

    pub async fn get(&self, zone_id: &str) -> Result<Zone, Error> {
        let zone_id = require_id("zone id", zone_id)?;
        self.session
            .http
            .get(&format!("zones/{}", encode_segment(zone_id)), &[])
            .await?
            .into_result()
    }

    /// Create a zone in the configured account
    pub async fn create(&self, name: &str, zone_type: Option<ZoneType>) -> Result<Zone, Error> {
        let name = require_id("zone name", name)?;
        let body = CreateZone {
            name: name.to_string(),
            account: AccountId {
                id: self.session.account_id()?.to_string(),
            },
            zone_type,
        };
        self.session.http.post("zones", &body).await?.into_result()
    }

    pub async fn delete(&self, zone_id: &str) -> Result<(), Error> {
        let zone_id = require_id("zone id", zone_id)?;
        self.session
            .http
            .delete::<serde_json::Value>(&format!("zones/{}", encode_segment(zone_id)))
            .await?
            .into_option()?;
        Ok(())
    }
}
