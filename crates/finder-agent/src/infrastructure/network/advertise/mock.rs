//! Recording advertiser for tests.

use std::sync::{Mutex, PoisonError};

use super::{AdvertiseError, ServiceAdvertiser, ServiceRecord};

#[derive(Default)]
struct Calls {
    published: Vec<ServiceRecord>,
    withdrawn: u32,
    active: bool,
}

/// A [`ServiceAdvertiser`] that records calls instead of touching mDNS.
#[derive(Default)]
pub struct RecordingAdvertiser {
    calls: Mutex<Calls>,
    fail: bool,
}

impl RecordingAdvertiser {
    pub fn new() -> Self {
        Self::default()
    }

    /// An advertiser whose `publish` always fails.
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Calls::default()),
            fail: true,
        }
    }

    pub fn published(&self) -> Vec<ServiceRecord> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .published
            .clone()
    }

    /// Number of `withdraw` calls that removed an active record.
    pub fn withdrawn(&self) -> u32 {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).withdrawn
    }

    /// Whether a record is currently published.
    pub fn is_active(&self) -> bool {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).active
    }
}

impl ServiceAdvertiser for RecordingAdvertiser {
    fn publish(&self, record: &ServiceRecord) -> Result<(), AdvertiseError> {
        if self.fail {
            return Err(AdvertiseError::Hostname(std::io::Error::new(
                std::io::ErrorKind::Other,
                "recording advertiser configured to fail",
            )));
        }
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.published.push(record.clone());
        calls.active = true;
        Ok(())
    }

    fn withdraw(&self) {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        if calls.active {
            calls.active = false;
            calls.withdrawn += 1;
        }
    }
}
