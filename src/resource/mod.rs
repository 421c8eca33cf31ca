//! Resource APIs
//!
//! One module per resource family. Each is a thin layer of typed DTOs and
//! endpoint paths on top of the [`crate::engine`] primitives.
//!
//! # Architecture
//!
//! - [`fetcher`] - Connects list endpoints to the pagination engine
//! - [`zones`] - Zones
//! - [`dns`] - DNS records of a zone
//! - [`accounts`] - Accounts, account members and roles
//! - [`d1`] - D1 databases (page-based listing with unreliable totals)
//! - [`r2`] - R2 buckets and objects (cursor listing, metered calls, batch deletes)

pub mod accounts;
pub mod d1;
pub mod dns;
pub mod fetcher;
pub mod r2;
pub mod zones;

pub use accounts::{Account, AccountsApi, Member, MemberUser, MembersApi, Role, RolesApi};
pub use d1::{D1Api, D1Database, QueryMeta, QueryResult};
pub use dns::{DnsApi, DnsFilter, DnsRecord, DnsRecordParams};
pub use r2::{Bucket, HttpMetadata, ObjectFilter, R2Api, R2Object};
pub use zones::{Zone, ZoneFilter, ZonesApi};
