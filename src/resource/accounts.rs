//! Accounts, members and roles

use super::fetcher::{self, encode_segment, require_id, ListRequest, ListStyle};
use crate::api::client::Session;
use crate::engine::pagination::{Paginated, TotalPages};
use crate::error::Error;
use crate::types::MemberStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Permission grants keyed by product, e.g. `{"dns": {"read": true}}`
    #[serde(default)]
    pub permissions: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberUser {
    #[serde(default)]
    pub id: Option<String>,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub user: MemberUser,
    #[serde(default)]
    pub status: Option<MemberStatus>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Account endpoints
#[derive(Debug)]
pub struct AccountsApi {
    session: Arc<Session>,
}

impl AccountsApi {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Accounts the token can access
    pub fn list(&self, name: Option<&str>, cancel: CancellationToken) -> Paginated<'static, Account> {
        let request = ListRequest::new(
            "accounts".to_string(),
            ListStyle::Numbered(TotalPages::Reliable),
        )
        .filter("name", name);
        fetcher::list(&self.session, request, cancel)
    }

    pub async fn get(&self, account_id: &str) -> Result<Account, Error> {
        let account_id = require_id("account id", account_id)?;
        self.session
            .http
            .get(&format!("accounts/{}", encode_segment(account_id)), &[])
            .await?
            .into_result()
    }
}

/// Member endpoints of the configured account
#[derive(Debug)]
pub struct MembersApi {
    session: Arc<Session>,
}

impl MembersApi {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    fn members_path(&self) -> Result<String, Error> {
        Ok(format!("accounts/{}/members", encode_segment(self.session.account_id()?)))
    }

    pub fn list(
        &self,
        status: Option<MemberStatus>,
        cancel: CancellationToken,
    ) -> Result<Paginated<'static, Member>, Error> {
        let request = ListRequest::new(
            self.members_path()?,
            ListStyle::Numbered(TotalPages::Reliable),
        )
        .filter("status", status);
        Ok(fetcher::list(&self.session, request, cancel))
    }

    pub async fn get(&self, member_id: &str) -> Result<Member, Error> {
        let member_id = require_id("member id", member_id)?;
        self.session
            .http
            .get(&format!("{}/{}", self.members_path()?, encode_segment(member_id)), &[])
            .await?
            .into_result()
    }

    pub async fn remove(&self, member_id: &str) -> Result<(), Error> {
        let member_id = require_id("member id", member_id)?;
        self.session
            .http
            .delete::<Value>(&format!("{}/{}", self.members_path()?, encode_segment(member_id)))
            .await?
            .into_option()?;
        Ok(())
    }
}

/// Role endpoints of the configured account
#[derive(Debug)]
pub struct RolesApi {
    session: Arc<Session>,
}

impl RolesApi {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    fn roles_path(&self) -> Result<String, Error> {
        Ok(format!("accounts/{}/roles", encode_segment(self.session.account_id()?)))
    }

    pub fn list(&self, cancel: CancellationToken) -> Result<Paginated<'static, Role>, Error> {
        let request = ListRequest::new(
            self.roles_path()?,
            ListStyle::Numbered(TotalPages::Reliable),
        );
        Ok(fetcher::list(&self.session, request, cancel))
    }

    pub async fn get(&self, role_id: &str) -> Result<Role, Error> {
        let role_id = require_id("role id", role_id)?;
        self.session
            .http
            .get(&format!("{}/{}", self.roles_path()?, encode_segment(role_id)), &[])
            .await?
            .into_result()
    }
}
