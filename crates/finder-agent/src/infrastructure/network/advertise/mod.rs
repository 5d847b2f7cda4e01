//! mDNS service advertisement.
//!
//! Unlike the other strategies the advertisement is not a timed retry: a
//! service record (type + instance name + port) is published once and the
//! mDNS responder keeps answering queries for it until the record is withdrawn
//! by `stop()` or the process exits.
//!
//! The responder itself is provided by `mdns-sd`, which runs its own
//! background thread.  The daemon is only created on the first publish, so a
//! configuration without the advertisement strategy never opens port 5353.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use finder_core::protocol::defaults::{SERVICE_NAME, SERVICE_PORT, SERVICE_TYPE};
use mdns_sd::{ServiceDaemon, ServiceInfo};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod mock;

/// Errors raised while publishing the service record.
#[derive(Debug, Error)]
pub enum AdvertiseError {
    /// The mDNS daemon could not start or rejected the record.
    #[error("mDNS error: {0}")]
    Mdns(#[from] mdns_sd::Error),
    /// The local host name could not be read.
    #[error("could not read host name: {0}")]
    Hostname(#[from] std::io::Error),
}

/// The record published on the local network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Fully qualified service type, e.g. `_test._tcp.local.`.
    pub service_type: String,
    pub instance_name: String,
    pub port: u16,
}

impl Default for ServiceRecord {
    fn default() -> Self {
        Self {
            service_type: SERVICE_TYPE.to_string(),
            instance_name: SERVICE_NAME.to_string(),
            port: SERVICE_PORT,
        }
    }
}

/// Publishes and withdraws the discovery service record.
pub trait ServiceAdvertiser: Send + Sync {
    /// Publishes `record`, replacing any record published earlier.
    ///
    /// # Errors
    ///
    /// Returns [`AdvertiseError`] if the record cannot be published.
    fn publish(&self, record: &ServiceRecord) -> Result<(), AdvertiseError>;

    /// Withdraws the published record.  A no-op when nothing is published.
    fn withdraw(&self);
}

#[derive(Default)]
struct MdnsState {
    daemon: Option<ServiceDaemon>,
    /// Full name of the currently registered record.
    registered: Option<String>,
}

/// [`ServiceAdvertiser`] backed by the `mdns-sd` responder.
#[derive(Default)]
pub struct MdnsAdvertiser {
    state: Mutex<MdnsState>,
}

impl MdnsAdvertiser {
    pub fn new() -> Self {
        Self::default()
    }
}

/// `<hostname>.local.`, the host name carried in the SRV record.
fn local_host_name() -> Result<String, AdvertiseError> {
    let name = hostname::get()?
        .into_string()
        .unwrap_or_else(|_| "devicefinder".to_string());
    Ok(format!("{name}.local."))
}

impl ServiceAdvertiser for MdnsAdvertiser {
    fn publish(&self, record: &ServiceRecord) -> Result<(), AdvertiseError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let daemon = match state.daemon.as_ref() {
            Some(daemon) => daemon.clone(),
            None => {
                let daemon = ServiceDaemon::new()?;
                state.daemon = Some(daemon.clone());
                daemon
            }
        };

        if let Some(previous) = state.registered.take() {
            if let Err(e) = daemon.unregister(&previous) {
                warn!("failed to unregister previous record {previous}: {e}");
            }
        }

        let host_name = local_host_name()?;
        // An empty address list plus `enable_addr_auto` lets the responder
        // fill in every interface address itself.
        let info = ServiceInfo::new(
            &record.service_type,
            &record.instance_name,
            &host_name,
            "",
            record.port,
            None::<HashMap<String, String>>,
        )?
        .enable_addr_auto();

        let fullname = info.get_fullname().to_string();
        daemon.register(info)?;
        info!(
            "advertising {fullname} on port {} as {host_name}",
            record.port
        );
        state.registered = Some(fullname);
        Ok(())
    }

    fn withdraw(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(fullname) = state.registered.take() else {
            return;
        };
        if let Some(daemon) = state.daemon.as_ref() {
            match daemon.unregister(&fullname) {
                Ok(_) => info!("withdrew service record {fullname}"),
                Err(e) => warn!("failed to withdraw service record {fullname}: {e}"),
            }
        }
    }
}

impl Drop for MdnsAdvertiser {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(daemon) = state.daemon.take() {
            if let Err(e) = daemon.shutdown() {
                debug!("mDNS daemon shutdown: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_record_default_matches_protocol() {
        // Arrange / Act
        let record = ServiceRecord::default();

        // Assert
        assert_eq!(record.service_type, "_test._tcp.local.");
        assert_eq!(record.instance_name, "JumpWDevice");
        assert_eq!(record.port, 8080);
    }

    #[test]
    fn test_local_host_name_is_fully_qualified() {
        if let Ok(name) = local_host_name() {
            assert!(name.ends_with(".local."), "got {name}");
        }
    }

    #[test]
    fn test_withdraw_without_publish_is_noop() {
        let advertiser = MdnsAdvertiser::new();
        advertiser.withdraw();
        advertiser.withdraw();
    }
}
