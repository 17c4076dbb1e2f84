//! DNS record synchronization against a hosted DNS provider.
//!
//! Publishes the addresses the [allocators][crate::allocator] wrote into host descriptors as
//! `A`/`AAAA` records, and removes them again when a host is retired. The allocators never call
//! into this module, the only contract between the two is the descriptor format.
//!
//! The provider is reached through the [`RecordApi`] trait. [`hetzner::HetznerDns`] implements
//! it for the [Hetzner DNS API][hetzner-api].
//!
//! # `add-host`
//!
//! [`sync::add_host`] creates the `A` and `AAAA` records of a FQDN when they don't exist yet.
//! Existing records pointing at a different address are an error and nothing is changed.
//!
//! # `delete-host`
//!
//! [`sync::delete_host`] looks up the addresses a FQDN resolves to and deletes *every* record of
//! the same type pointing at them, so aliases of the host go away too.
//!
//! [hetzner-api]: https://dns.hetzner.com/api-docs

use crate::error::Error;
use serde::{Deserialize, Deserializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use time::macros::format_description;
use time::PrimitiveDateTime;

#[cfg(test)]
pub(crate) mod fake;
pub mod hetzner;
pub mod sync;

pub use hetzner::HetznerDns;

const DEFAULT_RECORD_TTL: u32 = 86400;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    SRV,
    TXT,
    MX,
    NS,
    SOA,
    /// Any type this crate doesn't manage, kept by name.
    Other(String),
}

impl RecordType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::CNAME => "CNAME",
            Self::SRV => "SRV",
            Self::TXT => "TXT",
            Self::MX => "MX",
            Self::NS => "NS",
            Self::SOA => "SOA",
            Self::Other(name) => name,
        }
    }
}

impl FromStr for RecordType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "A" => Self::A,
            "AAAA" => Self::AAAA,
            "CNAME" => Self::CNAME,
            "SRV" => Self::SRV,
            "TXT" => Self::TXT,
            "MX" => Self::MX,
            "NS" => Self::NS,
            "SOA" => Self::SOA,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RecordType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_else(|never: Infallible| match never {}))
    }
}

/// A record as reported by the provider.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub name: String,
    pub value: String,
    pub zone_id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created: PrimitiveDateTime,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub modified: PrimitiveDateTime,
    #[serde(default = "default_record_ttl")]
    pub ttl: u32,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} record {}: {} (ttl {})",
            self.record_type, self.name, self.value, self.ttl
        )
    }
}

/// A record to be created in the configured zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub record_type: RecordType,
    pub name: String,
    pub value: String,
    pub ttl: u32,
}

/// Selects records by name, value and type. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub name: Option<String>,
    pub value: Option<String>,
    pub record_type: Option<RecordType>,
}

impl RecordFilter {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn of_type(mut self, record_type: RecordType) -> Self {
        self.record_type = Some(record_type);
        self
    }

    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.name.as_ref().map_or(true, |n| *n == record.name)
            && self.value.as_ref().map_or(true, |v| *v == record.value)
            && self
                .record_type
                .as_ref()
                .map_or(true, |t| *t == record.record_type)
    }
}

/// Record management for a single DNS zone.
#[async_trait::async_trait]
pub trait RecordApi: Send + Sync {
    /// The zone's domain name, e.g. `example.com`.
    async fn zone_name(&self) -> Result<String, Error>;

    /// Every record in the zone.
    async fn records(&self) -> Result<Vec<Record>, Error>;

    async fn create_record(&self, record: NewRecord) -> Result<Record, Error>;

    async fn delete_record(&self, record_id: &str) -> Result<(), Error>;

    /// The records in the zone matching `filter`.
    async fn find_records(&self, filter: &RecordFilter) -> Result<Vec<Record>, Error> {
        Ok(self
            .records()
            .await?
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect())
    }
}

fn default_record_ttl() -> u32 {
    DEFAULT_RECORD_TTL
}

/// Timestamps come as `2021-04-06 11:51:04.06 +0000 UTC`. Everything after the seconds is
/// dropped.
fn parse_timestamp(raw: &str) -> Result<PrimitiveDateTime, time::error::Parse> {
    let seconds = raw.get(..19).unwrap_or(raw);
    PrimitiveDateTime::parse(
        seconds,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<PrimitiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}
