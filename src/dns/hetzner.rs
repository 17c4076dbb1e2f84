use crate::config::{DnsConfig, HetznerCredentials};
use crate::dns::{NewRecord, Record, RecordApi};
use crate::error::Error;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;

const USER_AGENT: &str = concat!("update-dns-script/", env!("CARGO_PKG_VERSION"));
const AUTH_HEADER: &str = "auth-api-token";

/// [`RecordApi`] for one zone hosted by Hetzner DNS.
#[derive(Debug)]
pub struct HetznerDns {
    client: Client,
    endpoint: String,
    zone_id: String,
    zone_name: OnceCell<String>,
}

#[derive(Deserialize)]
struct ZoneResponse {
    zone: Option<Zone>,
}

#[derive(Deserialize)]
struct Zone {
    name: Option<String>,
}

#[derive(Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<Record>,
}

#[derive(Deserialize)]
struct RecordResponse {
    record: Record,
}

impl HetznerDns {
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeaderValue`] if the token can't be sent as a header and
    /// [`Error::Http`] if the client can't be built.
    pub fn new(config: &DnsConfig, credentials: &HetznerCredentials) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(&credentials.token)?;
        token.set_sensitive(true);
        headers.insert(HeaderName::from_static(AUTH_HEADER), token);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            zone_id: credentials.zone_id.clone(),
            zone_name: OnceCell::new(),
        })
    }

    fn api_url(&self, fragment: &str) -> String {
        format!("{}{fragment}", self.endpoint)
    }

    async fn fetch_zone_name(&self) -> Result<String, Error> {
        let url = self.api_url(&format!("/zones/{}", self.zone_id));
        tracing::debug!("GET {url}");
        let response: ZoneResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response
            .zone
            .and_then(|zone| zone.name)
            .ok_or_else(|| Error::ZoneNameUnavailable(self.zone_id.clone()))
    }
}

#[async_trait::async_trait]
impl RecordApi for HetznerDns {
    async fn zone_name(&self) -> Result<String, Error> {
        self.zone_name
            .get_or_try_init(|| self.fetch_zone_name())
            .await
            .cloned()
    }

    async fn records(&self) -> Result<Vec<Record>, Error> {
        let url = self.api_url("/records");
        tracing::debug!("GET {url} for zone {}", self.zone_id);
        let response: RecordsResponse = self
            .client
            .get(&url)
            .query(&[("zone_id", &self.zone_id)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.records)
    }

    async fn create_record(&self, record: NewRecord) -> Result<Record, Error> {
        let url = self.api_url("/records");
        tracing::info!(
            zone = %self.zone_id,
            "creating {} record {}: {}",
            record.record_type,
            record.name,
            record.value
        );
        let response: RecordResponse = self
            .client
            .post(&url)
            .json(&json!({
                "zone_id": self.zone_id,
                "type": record.record_type.as_str(),
                "name": record.name,
                "value": record.value,
                "ttl": record.ttl,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.record)
    }

    async fn delete_record(&self, record_id: &str) -> Result<(), Error> {
        let url = self.api_url(&format!("/records/{record_id}"));
        tracing::info!(zone = %self.zone_id, "deleting record {record_id}");
        self.client.delete(&url).send().await?.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::RecordType;

    fn credentials() -> HetznerCredentials {
        serde_json::from_str(r#"{"token": "s3cr3t", "zoneId": "zone-1"}"#).unwrap()
    }

    #[test]
    fn urls_are_built_from_the_endpoint() {
        let config = DnsConfig {
            endpoint: "https://dns.example.net/api/v1/".to_string(),
            ..DnsConfig::default()
        };
        let api = HetznerDns::new(&config, &credentials()).unwrap();
        assert_eq!(
            api.api_url("/records/rec-1"),
            "https://dns.example.net/api/v1/records/rec-1"
        );
    }

    #[test]
    fn tokens_must_be_valid_header_values() {
        let credentials = HetznerCredentials {
            token: "line\nbreak".to_string(),
            zone_id: "zone-1".to_string(),
        };
        assert!(matches!(
            HetznerDns::new(&DnsConfig::default(), &credentials),
            Err(Error::InvalidHeaderValue(_))
        ));
    }

    #[test]
    fn token_is_not_logged() {
        let api = HetznerDns::new(&DnsConfig::default(), &credentials()).unwrap();
        assert!(!format!("{api:?}").contains("s3cr3t"));
    }

    #[test]
    fn parses_record_listings() {
        let listing: RecordsResponse = serde_json::from_str(
            r#"{"records": [
                {"id": "1", "type": "A", "name": "web1", "value": "203.0.113.2",
                 "zone_id": "zone-1", "ttl": 60,
                 "created": "2021-04-06 11:51:04.06 +0000 UTC",
                 "modified": "2021-04-06 11:51:04.06 +0000 UTC"},
                {"id": "2", "type": "NS", "name": "@", "value": "hydrogen.ns.hetzner.com.",
                 "zone_id": "zone-1",
                 "created": "2021-04-06 11:51:04.06 +0000 UTC",
                 "modified": "2021-04-06 11:51:04.06 +0000 UTC"}
            ], "meta": {"pagination": {"page": 1}}}"#,
        )
        .unwrap();
        assert_eq!(listing.records.len(), 2);
        assert_eq!(listing.records[1].record_type, RecordType::NS);
        assert_eq!(listing.records[1].ttl, 86400);
    }

    #[test]
    fn missing_zone_name_is_reported() {
        let response: ZoneResponse = serde_json::from_str(r#"{"zone": {"id": "zone-1"}}"#).unwrap();
        assert!(response.zone.and_then(|z| z.name).is_none());
    }
}
