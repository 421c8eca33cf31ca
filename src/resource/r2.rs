//! R2 object storage
//!
//! Listing and object calls are billed; every method that issues one reports
//! its cost as [`Metrics`]: listings through [`Paginated::metrics`], single
//! object calls through [`Metered`], batches through the returned total or
//! the partial total carried by [`BatchError`].

use super::fetcher::{self, encode_segment, require_id, ListRequest, ListStyle};
use crate::api::client::Session;
use crate::engine::metrics::{Metered, Metrics};
use crate::engine::pagination::Paginated;
use crate::error::{BatchError, Error};
use crate::types::{LocationHint, StorageClass};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use reqwest::header::{self, HeaderName};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub creation_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<LocationHint>,
    #[serde(default)]
    pub storage_class: Option<StorageClass>,
}

#[derive(Debug, Deserialize)]
struct BucketList {
    #[serde(default)]
    buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBucket<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_hint: Option<&'a LocationHint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_class: Option<&'a StorageClass>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpMetadata {
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_encoding: Option<String>,
    #[serde(default)]
    pub cache_control: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct R2Object {
    pub key: String,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub storage_class: Option<StorageClass>,
    #[serde(default)]
    pub http_metadata: Option<HttpMetadata>,
    #[serde(default)]
    pub custom_metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectFilter {
    pub prefix: Option<String>,
    /// Group keys sharing a prefix up to this character
    pub delimiter: Option<String>,
}

/// R2 endpoints of the configured account
#[derive(Debug)]
pub struct R2Api {
    session: Arc<Session>,
}

impl R2Api {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    fn buckets_path(&self) -> Result<String, Error> {
        Ok(format!("accounts/{}/r2/buckets", encode_segment(self.session.account_id()?)))
    }

    fn bucket_path(&self, bucket: &str) -> Result<String, Error> {
        let bucket = require_id("bucket name", bucket)?;
        Ok(format!("{}/{}", self.buckets_path()?, encode_segment(bucket)))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<String, Error> {
        let key = require_id("object key", key)?;
        Ok(format!("{}/objects/{}", self.bucket_path(bucket)?, encode_segment(key)))
    }

    /// List buckets; each page is one class A operation
    pub fn list_buckets(
        &self,
        name_contains: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<Paginated<'static, Bucket>, Error> {
        let request = ListRequest {
            path: self.buckets_path()?,
            filters: Vec::new(),
            style: ListStyle::Cursor,
            cost: Metrics::class_a(1),
            extract: |list: BucketList| list.buckets,
        }
        .filter("name_contains", name_contains);
        Ok(fetcher::list(&self.session, request, cancel))
    }

    pub async fn create_bucket(
        &self,
        name: &str,
        location: Option<&LocationHint>,
        storage_class: Option<&StorageClass>,
    ) -> Result<Metered<Bucket>, Error> {
        let body = CreateBucket {
            name: require_id("bucket name", name)?,
            location_hint: location,
            storage_class,
        };
        let bucket = self
            .session
            .http
            .post(&self.buckets_path()?, &body)
            .await?
            .into_result()?;
        Ok(Metered::new(bucket, Metrics::class_a(1)))
    }

    pub async fn get_bucket(&self, name: &str) -> Result<Metered<Bucket>, Error> {
        let bucket = self
            .session
            .http
            .get(&self.bucket_path(name)?, &[])
            .await?
            .into_result()?;
        Ok(Metered::new(bucket, Metrics::class_b(1)))
    }

    pub async fn delete_bucket(&self, name: &str) -> Result<(), Error> {
        self.session
            .http
            .delete::<Value>(&self.bucket_path(name)?)
            .await?
            .into_option()?;
        Ok(())
    }

    /// List objects; each page is one class A operation
    pub fn list_objects(
        &self,
        bucket: &str,
        filter: &ObjectFilter,
        cancel: CancellationToken,
    ) -> Result<Paginated<'static, R2Object>, Error> {
        let request = ListRequest::new(
            format!("{}/objects", self.bucket_path(bucket)?),
            ListStyle::Cursor,
        )
        .cost(Metrics::class_a(1))
        .filter("prefix", filter.prefix.as_deref())
        .filter("delimiter", filter.delimiter.as_deref());
        Ok(fetcher::list(&self.session, request, cancel))
    }

    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<Metered<R2Object>, Error> {
        let path = self.object_path(bucket, key)?;
        let size = body.len() as u64;
        let object = self
            .session
            .http
            .request_bytes(Method::PUT, &path, body, content_type)
            .await?
            .into_result()?;
        Ok(Metered::new(object, Metrics::class_a(1).with_uploaded(size)))
    }

    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Metered<Vec<u8>>, Error> {
        let bytes = self.session.http.download(&self.object_path(bucket, key)?).await?;
        let size = bytes.len() as u64;
        Ok(Metered::new(bytes, Metrics::class_b(1).with_downloaded(size)))
    }

    /// Object metadata from the response headers, without the body
    pub async fn head_object(&self, bucket: &str, key: &str) -> Result<Metered<R2Object>, Error> {
        let headers = self.session.http.head(&self.object_path(bucket, key)?).await?;
        let value_of = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        let http_metadata = HttpMetadata {
            content_type: value_of(header::CONTENT_TYPE),
            content_encoding: value_of(header::CONTENT_ENCODING),
            cache_control: value_of(header::CACHE_CONTROL),
        };
        let object = R2Object {
            key: key.to_string(),
            etag: value_of(header::ETAG).map(|etag| etag.trim_matches('"').to_string()),
            size: value_of(header::CONTENT_LENGTH)
                .and_then(|len| len.parse().ok())
                .unwrap_or(0),
            last_modified: value_of(header::LAST_MODIFIED)
                .and_then(|date| DateTime::parse_from_rfc2822(&date).ok())
                .map(|date| date.with_timezone(&Utc)),
            storage_class: value_of(HeaderName::from_static("cf-r2-storage-class")).map(StorageClass::from),
            http_metadata: Some(http_metadata),
            custom_metadata: HashMap::new(),
        };
        Ok(Metered::new(object, Metrics::class_b(1)))
    }

    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<Metered<()>, Error> {
        self.session
            .http
            .delete::<Value>(&self.object_path(bucket, key)?)
            .await?
            .into_option()?;
        Ok(Metered::new((), Metrics::class_a(1)))
    }

    /// Delete many objects, one request per key
    ///
    /// Every key is attempted. On partial failure the error lists the keys
    /// still present and the metrics of the deletes that went through.
    pub async fn delete_objects(
        &self,
        bucket: &str,
        keys: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<Metrics, BatchError<String>> {
        // Surface a missing account or bucket once, not once per key
        self.bucket_path(bucket).map_err(BatchError::Invalid)?;

        self.session
            .batch()
            .run(keys, cancel, |key| {
                let key = key.clone();
                async move {
                    let deleted = self.delete_object(bucket, &key).await?;
                    Ok::<_, Error>(deleted.metrics)
                }
                .boxed()
            })
            .await
    }
}
