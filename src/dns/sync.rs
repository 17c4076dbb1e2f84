use crate::dns::{NewRecord, Record, RecordApi, RecordFilter, RecordType};
use crate::error::Error;
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// The record name of `fqdn` relative to the API's zone. The zone apex is `@`.
///
/// # Errors
///
/// Returns [`Error::NotInZone`] if `fqdn` is not the zone or one of its subdomains.
pub async fn record_name<A>(api: &A, fqdn: &str) -> Result<String, Error>
where
    A: RecordApi + ?Sized,
{
    let zone = api.zone_name().await?;
    let zone = zone.trim_end_matches('.').to_ascii_lowercase();
    let fqdn = fqdn.trim_end_matches('.').to_ascii_lowercase();

    if fqdn == zone {
        return Ok("@".to_string());
    }
    match fqdn.strip_suffix(&format!(".{zone}")) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(Error::NotInZone { fqdn, zone }),
    }
}

/// Publish `ipv4` and `ipv6` as the `A` and `AAAA` records of `fqdn`.
///
/// Records that already exist with the same address are left alone. Nothing is created when any
/// existing `A`/`AAAA` record of the name points elsewhere.
///
/// # Errors
///
/// Returns [`Error::AddressMismatch`] listing the conflicting records as `name: value`, or the
/// error of the failing API call.
pub async fn add_host<A>(
    api: &A,
    fqdn: &str,
    ipv4: Ipv4Addr,
    ipv6: Ipv6Addr,
    ttl: u32,
) -> Result<Vec<Record>, Error>
where
    A: RecordApi + ?Sized,
{
    let name = record_name(api, fqdn).await?;
    let existing_v4 = api
        .find_records(&RecordFilter::named(&name).of_type(RecordType::A))
        .await?;
    let existing_v6 = api
        .find_records(&RecordFilter::named(&name).of_type(RecordType::AAAA))
        .await?;

    let mut mismatched = mismatches(&existing_v4, IpAddr::V4(ipv4));
    mismatched.extend(mismatches(&existing_v6, IpAddr::V6(ipv6)));
    if !mismatched.is_empty() {
        return Err(Error::AddressMismatch(mismatched));
    }

    let mut created = Vec::new();
    for (existing, record_type, value) in [
        (&existing_v4, RecordType::A, ipv4.to_string()),
        (&existing_v6, RecordType::AAAA, ipv6.to_string()),
    ] {
        if !existing.is_empty() {
            tracing::info!("{record_type} record for {name} already points at {value}");
            continue;
        }
        let record = api
            .create_record(NewRecord {
                record_type,
                name: name.clone(),
                value,
                ttl,
            })
            .await?;
        created.push(record);
    }
    Ok(created)
}

/// Delete the `A`/`AAAA` records of `fqdn` and every other record of the same type pointing at
/// the same addresses.
///
/// # Errors
///
/// Returns [`Error::AmbiguousAddresses`] before deleting anything if the name has more than one
/// distinct address of a family, or the error of the failing API call.
pub async fn delete_host<A>(api: &A, fqdn: &str) -> Result<Vec<Record>, Error>
where
    A: RecordApi + ?Sized,
{
    let name = record_name(api, fqdn).await?;

    let mut targets = Vec::new();
    for record_type in [RecordType::A, RecordType::AAAA] {
        let current = api
            .find_records(&RecordFilter::named(&name).of_type(record_type.clone()))
            .await?;
        let values: BTreeSet<String> = current.into_iter().map(|r| r.value).collect();
        if values.len() > 1 {
            return Err(Error::AmbiguousAddresses {
                fqdn: fqdn.to_string(),
                values: values.into_iter().collect(),
            });
        }
        if let Some(value) = values.into_iter().next() {
            targets.push((record_type, value));
        }
    }

    let mut deleted = Vec::new();
    for (record_type, value) in targets {
        let pointing = api
            .find_records(&RecordFilter::default().with_value(value).of_type(record_type))
            .await?;
        for record in pointing {
            api.delete_record(&record.id).await?;
            deleted.push(record);
        }
    }
    Ok(deleted)
}

/// `name: value` of every record not pointing at `expected`, sorted.
fn mismatches(records: &[Record], expected: IpAddr) -> Vec<String> {
    let mut found: Vec<String> = records
        .iter()
        .filter(|r| r.value.parse::<IpAddr>().map_or(true, |ip| ip != expected))
        .map(|r| format!("{}: {}", r.name, r.value))
        .collect();
    found.sort();
    found
}
