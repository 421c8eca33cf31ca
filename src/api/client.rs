//! Cloudflare Client
//!
//! Main client combining configuration and HTTP functionality. Resource APIs
//! are created on first use and shared by every clone of the client.

use super::http::HttpClient;
use crate::config::Config;
use crate::engine::batch::BatchExecutor;
use crate::error::Error;
use crate::resource::accounts::{AccountsApi, MembersApi, RolesApi};
use crate::resource::d1::D1Api;
use crate::resource::dns::DnsApi;
use crate::resource::r2::R2Api;
use crate::resource::zones::ZonesApi;
use std::sync::{Arc, OnceLock};

/// State shared by every resource API of one client
#[derive(Debug)]
pub struct Session {
    pub http: HttpClient,
    account_id: Option<String>,
    per_page: u32,
    batch: BatchExecutor,
}

impl Session {
    pub fn new(http: HttpClient, account_id: Option<String>, per_page: u32) -> Self {
        Self {
            http,
            account_id: account_id.filter(|id| !id.trim().is_empty()),
            per_page: per_page.max(1),
            batch: BatchExecutor::new(),
        }
    }

    pub fn with_batch(mut self, batch: BatchExecutor) -> Self {
        self.batch = batch;
        self
    }

    /// Account id, failing before any request is made when it is missing
    pub fn account_id(&self) -> Result<&str, Error> {
        self.account_id
            .as_deref()
            .ok_or_else(|| Error::config("No account id configured. Set CLOUDFLARE_ACCOUNT_ID or use --account-id"))
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn batch(&self) -> &BatchExecutor {
        &self.batch
    }
}

#[derive(Debug)]
struct Inner {
    session: Arc<Session>,
    zones: OnceLock<ZonesApi>,
    dns: OnceLock<DnsApi>,
    accounts: OnceLock<AccountsApi>,
    members: OnceLock<MembersApi>,
    roles: OnceLock<RolesApi>,
    d1: OnceLock<D1Api>,
    r2: OnceLock<R2Api>,
}

/// Main Cloudflare client
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    /// Create a client that owns its HTTP connection pool
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http = HttpClient::new(config.effective_base_url(), config.require_token()?)?;
        Ok(Self::from_session(Self::build_session(http, config)))
    }

    /// Create a client on top of a caller-managed `reqwest::Client`
    pub fn with_shared_http(pool: Arc<reqwest::Client>, config: &Config) -> Result<Self, Error> {
        let http = HttpClient::shared(pool, config.effective_base_url(), config.require_token()?)?;
        Ok(Self::from_session(Self::build_session(http, config)))
    }

    fn build_session(http: HttpClient, config: &Config) -> Session {
        Session::new(http, config.account_id.clone(), config.effective_per_page())
    }

    pub fn from_session(session: Session) -> Self {
        Self {
            inner: Arc::new(Inner {
                session: Arc::new(session),
                zones: OnceLock::new(),
                dns: OnceLock::new(),
                accounts: OnceLock::new(),
                members: OnceLock::new(),
                roles: OnceLock::new(),
                d1: OnceLock::new(),
                r2: OnceLock::new(),
            }),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.inner.session
    }

    pub fn zones(&self) -> &ZonesApi {
        self.inner
            .zones
            .get_or_init(|| ZonesApi::new(self.inner.session.clone()))
    }

    pub fn dns(&self) -> &DnsApi {
        self.inner
            .dns
            .get_or_init(|| DnsApi::new(self.inner.session.clone()))
    }

    pub fn accounts(&self) -> &AccountsApi {
        self.inner
            .accounts
            .get_or_init(|| AccountsApi::new(self.inner.session.clone()))
    }

    pub fn members(&self) -> &MembersApi {
        self.inner
            .members
            .get_or_init(|| MembersApi::new(self.inner.session.clone()))
    }

    pub fn roles(&self) -> &RolesApi {
        self.inner
            .roles
            .get_or_init(|| RolesApi::new(self.inner.session.clone()))
    }

    pub fn d1(&self) -> &D1Api {
        self.inner
            .d1
            .get_or_init(|| D1Api::new(self.inner.session.clone()))
    }

    pub fn r2(&self) -> &R2Api {
        self.inner
            .r2
            .get_or_init(|| R2Api::new(self.inner.session.clone()))
    }
}
