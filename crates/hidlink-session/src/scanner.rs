use hidlink_transport::{BdAddr, Radio, ScanResult};
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::record::DeviceRecord;

/// Finds target peripherals and records their addresses.
pub struct Scanner<R> {
    radio: R,
    config: ScanConfig,
}

impl<R: Radio> Scanner<R> {
    /// Create a scanner with default configuration.
    pub fn new(radio: R) -> Self {
        Self::with_config(radio, ScanConfig::default())
    }

    /// Create a scanner with explicit configuration.
    pub fn with_config(radio: R, config: ScanConfig) -> Self {
        Self { radio, config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Run up to `rounds` inquiry rounds, filling empty slots of `records`
    /// with newly seen target devices.
    ///
    /// Returns the number of records that became found during this call.
    /// Already-found records are never touched, so repeated calls against an
    /// unchanged environment return 0. An unavailable adapter yields 0 and
    /// a failed round ends the scan with whatever was found so far.
    pub fn discover(&self, records: &mut [DeviceRecord], rounds: u32) -> usize {
        let capacity = records.len();
        let mut found_total = records.iter().filter(|r| r.is_found()).count();
        let mut newly_found = 0usize;

        if found_total >= capacity {
            return 0;
        }

        let mut control = match self.radio.open() {
            Ok(control) => control,
            Err(err) => {
                warn!(error = %err, "radio unavailable, skipping discovery");
                return 0;
            }
        };

        let params = self.config.inquiry_params();
        let mut round = 0u32;
        while round < rounds && found_total < capacity {
            round += 1;

            let results = match control.inquiry(&params) {
                Ok(results) => results,
                Err(err) => {
                    warn!(error = %err, round, newly_found, "inquiry failed, ending scan");
                    break;
                }
            };
            debug!(round, visible = results.len(), "inquiry round complete");

            for result in results {
                if found_total >= capacity {
                    break;
                }
                if !self.is_target(&result) || is_known(records, result.address) {
                    continue;
                }
                let Some(slot) = records.iter_mut().find(|r| !r.is_found()) else {
                    break;
                };
                if let Err(err) = slot.mark_found(result.address) {
                    warn!(error = %err, address = %result.address, "could not record device");
                    continue;
                }
                info!(id = slot.id(), address = %result.address, "found device");
                found_total += 1;
                newly_found += 1;
            }
        }

        // `control` drops here, releasing the adapter handle.
        newly_found
    }

    fn is_target(&self, result: &ScanResult) -> bool {
        result.class == self.config.device_class
    }
}

fn is_known(records: &[DeviceRecord], address: BdAddr) -> bool {
    records
        .iter()
        .any(|r| r.is_found() && r.address() == address)
}
