use crate::dns::{NewRecord, Record, RecordApi, RecordType};
use crate::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use time::macros::datetime;

/// A zone held in memory, recording every mutation.
pub(crate) struct FakeZone {
    name: String,
    records: Mutex<Vec<Record>>,
    next_id: AtomicUsize,
    pub(crate) mutations: AtomicUsize,
}

impl FakeZone {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            mutations: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_record(self, record_type: RecordType, name: &str, value: &str) -> Self {
        let record = self.record(NewRecord {
            record_type,
            name: name.to_string(),
            value: value.to_string(),
            ttl: 86400,
        });
        self.records.lock().unwrap().push(record);
        self
    }

    pub(crate) fn snapshot(&self) -> Vec<(String, String, String)> {
        let mut all: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|r| (r.record_type.to_string(), r.name.clone(), r.value.clone()))
            .collect();
        all.sort();
        all
    }

    fn record(&self, new: NewRecord) -> Record {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Record {
            id: format!("rec-{id}"),
            record_type: new.record_type,
            name: new.name,
            value: new.value,
            zone_id: "zone-1".to_string(),
            created: datetime!(2021-04-06 11:51:04),
            modified: datetime!(2021-04-06 11:51:04),
            ttl: new.ttl,
        }
    }
}

#[async_trait::async_trait]
impl RecordApi for FakeZone {
    async fn zone_name(&self) -> Result<String, Error> {
        Ok(self.name.clone())
    }

    async fn records(&self) -> Result<Vec<Record>, Error> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn create_record(&self, new: NewRecord) -> Result<Record, Error> {
        let record = self.record(new);
        self.records.lock().unwrap().push(record.clone());
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn delete_record(&self, record_id: &str) -> Result<(), Error> {
        self.records.lock().unwrap().retain(|r| r.id != record_id);
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
