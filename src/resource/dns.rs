//! DNS records

use super::fetcher::{self, encode_segment, require_id, ListRequest, ListStyle};
use crate::api::client::Session;
use crate::engine::metrics::Metrics;
use crate::engine::pagination::{Paginated, TotalPages};
use crate::error::{BatchError, Error};
use crate::types::DnsRecordType;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: DnsRecordType,
    pub content: String,
    /// 1 means automatic
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub proxied: Option<bool>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_on: Option<DateTime<Utc>>,
}

/// Body of create and update requests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DnsRecordParams {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: DnsRecordType,
    pub content: String,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DnsFilter {
    pub name: Option<String>,
    pub record_type: Option<DnsRecordType>,
    pub content: Option<String>,
}

/// DNS record endpoints of a zone
#[derive(Debug)]
pub struct DnsApi {
    session: Arc<Session>,
}

impl DnsApi {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    fn records_path(zone_id: &str) -> String {
        format!("zones/{}/dns_records", encode_segment(zone_id))
    }

    fn record_path(zone_id: &str, record_id: &str) -> String {
        format!("{}/{}", Self::records_path(zone_id), encode_segment(record_id))
    }

    pub fn list(
        &self,
        zone_id: &str,
        filter: &DnsFilter,
        cancel: CancellationToken,
    ) -> Result<Paginated<'static, DnsRecord>, Error> {
        let zone_id = require_id("zone id", zone_id)?;
        let request = ListRequest::new(
            Self::records_path(zone_id),
            ListStyle::Numbered(TotalPages::Reliable),
        )
        .filter("name", filter.name.as_deref())
        .filter("type", filter.record_type.as_ref())
        .filter("content", filter.content.as_deref());

        Ok(fetcher::list(&self.session, request, cancel))
    }

    pub async fn get(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord, Error> {
        let zone_id = require_id("zone id", zone_id)?;
        let record_id = require_id("record id", record_id)?;
        self.session
            .http
            .get(&Self::record_path(zone_id, record_id), &[])
            .await?
            .into_result()
    }

    pub async fn create(&self, zone_id: &str, params: &DnsRecordParams) -> Result<DnsRecord, Error> {
        let zone_id = require_id("zone id", zone_id)?;
        self.session
            .http
            .post(&Self::records_path(zone_id), params)
            .await?
            .into_result()
    }

    /// Overwrite a record
    pub async fn update(
        &self,
        zone_id: &str,
        record_id: &str,
        params: &DnsRecordParams,
    ) -> Result<DnsRecord, Error> {
        let zone_id = require_id("zone id", zone_id)?;
        let record_id = require_id("record id", record_id)?;
        self.session
            .http
            .put(&Self::record_path(zone_id, record_id), params)
            .await?
            .into_result()
    }

    pub async fn delete(&self, zone_id: &str, record_id: &str) -> Result<(), Error> {
        let zone_id = require_id("zone id", zone_id)?;
        let record_id = require_id("record id", record_id)?;
        self.session
            .http
            .delete::<serde_json::Value>(&Self::record_path(zone_id, record_id))
            .await?
            .into_option()?;
        Ok(())
    }

    /// Delete several records, one request each
    ///
    /// Every id is attempted; the ids that could not be deleted are returned
    /// in the error for a retry.
    pub async fn delete_many(
        &self,
        zone_id: &str,
        record_ids: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<Metrics, BatchError<String>> {
        let zone_id = require_id("zone id", zone_id).map_err(BatchError::Invalid)?;

        self.session
            .batch()
            .run(record_ids, cancel, |record_id| {
                let record_id = record_id.clone();
                let zone_id = zone_id.to_string();
                async move {
                    self.delete(&zone_id, &record_id).await?;
                    Ok::<_, Error>(Metrics::ZERO)
                }
                .boxed()
            })
            .await
    }
}
