use std::time::Duration;

use hidlink_frame::ReportMode;
use hidlink_transport::{DeviceClass, InquiryParams};
use serde::{Deserialize, Serialize};

use crate::record::DeviceRecord;

/// Default readiness wait per poll.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// What to do about repeated transient read errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadErrorPolicy {
    /// Tear the session down after this many consecutive transient errors.
    /// `None` never escalates.
    pub max_consecutive: Option<u32>,
}

impl ReadErrorPolicy {
    /// Report every transient error, never tear down.
    pub fn never() -> Self {
        Self {
            max_consecutive: None,
        }
    }

    /// Tear down on the `n`th consecutive transient error.
    pub fn after(n: u32) -> Self {
        Self {
            max_consecutive: Some(n.max(1)),
        }
    }

    pub(crate) fn should_escalate(&self, consecutive: u32) -> bool {
        self.max_consecutive.is_some_and(|max| consecutive >= max)
    }
}

/// Discovery configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Only devices advertising this class are considered.
    pub device_class: DeviceClass,
    /// Length of one inquiry round in 1.28 s units.
    pub inquiry_length: u8,
    /// Upper bound on responses per round (at least 1).
    pub max_responses: u8,
    /// Flush the adapter's inquiry cache before each round.
    pub flush_cache: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let params = InquiryParams::default();
        Self {
            device_class: DeviceClass::WIIMOTE,
            inquiry_length: params.length,
            max_responses: params.max_responses,
            flush_cache: params.flush_cache,
        }
    }
}

impl ScanConfig {
    pub fn inquiry_params(&self) -> InquiryParams {
        InquiryParams {
            length: self.inquiry_length.max(1),
            max_responses: self.max_responses.max(1),
            flush_cache: self.flush_cache,
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Channel opened first, carrying host-to-device commands.
    pub output_psm: u16,
    /// Channel opened second, carrying device-to-host reports.
    pub input_psm: u16,
    /// Readiness wait per poll, in milliseconds.
    pub poll_timeout_ms: u64,
    /// Escalation of transient read errors.
    pub read_errors: ReadErrorPolicy,
    /// Send the report-type command after connecting.
    pub send_report_mode: bool,
    /// Reporting mode requested by that command.
    pub report_mode: ReportMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_psm: hidlink_frame::OUTPUT,
            input_psm: hidlink_frame::INPUT,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT.as_millis() as u64,
            read_errors: ReadErrorPolicy::default(),
            send_report_mode: true,
            report_mode: ReportMode::default(),
        }
    }
}

impl SessionConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// Apply the per-record settings (poll timeout, error policy).
    pub fn configure(&self, record: &mut DeviceRecord) {
        record.set_poll_timeout(self.poll_timeout());
        record.set_read_error_policy(self.read_errors);
    }

    /// Allocate `capacity` empty records with ids `1..=capacity`.
    pub fn records(&self, capacity: usize) -> Vec<DeviceRecord> {
        (1..=capacity as u32)
            .map(|id| {
                let mut record = DeviceRecord::new(id);
                self.configure(&mut record);
                record
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.output_psm, 0x11);
        assert_eq!(cfg.input_psm, 0x13);
        assert_eq!(cfg.poll_timeout(), Duration::from_millis(10));
        assert_eq!(cfg.read_errors.max_consecutive, None);

        let scan = ScanConfig::default();
        assert_eq!(scan.device_class, DeviceClass::WIIMOTE);
        assert_eq!(scan.inquiry_params(), InquiryParams::default());
    }

    #[test]
    fn escalation_policy() {
        assert!(!ReadErrorPolicy::never().should_escalate(u32::MAX));
        let policy = ReadErrorPolicy::after(3);
        assert!(!policy.should_escalate(2));
        assert!(policy.should_escalate(3));
        assert_eq!(ReadErrorPolicy::after(0).max_consecutive, Some(1));
    }

    #[test]
    fn zero_inquiry_fields_are_clamped() {
        let scan: ScanConfig =
            serde_json::from_str(r#"{"max_responses":0,"inquiry_length":0}"#).unwrap();
        let params = scan.inquiry_params();
        assert_eq!(params.length, 1);
        assert_eq!(params.max_responses, 1);
    }

    #[test]
    fn records_are_configured() {
        let cfg = SessionConfig {
            poll_timeout_ms: 4,
            read_errors: ReadErrorPolicy::after(2),
            ..SessionConfig::default()
        };
        let records = cfg.records(3);
        assert_eq!(records.len(), 3);
        assert_eq!(
            records.iter().map(DeviceRecord::id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(records
            .iter()
            .all(|r| r.poll_timeout() == Duration::from_millis(4)));
        assert!(records
            .iter()
            .all(|r| r.read_error_policy() == ReadErrorPolicy::after(2)));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: SessionConfig =
            serde_json::from_str(r#"{"poll_timeout_ms":2,"read_errors":{"max_consecutive":5}}"#)
                .unwrap();
        assert_eq!(cfg.poll_timeout_ms, 2);
        assert_eq!(cfg.read_errors, ReadErrorPolicy::after(5));
        assert_eq!(cfg.input_psm, 0x13);

        let scan: ScanConfig = serde_json::from_str(r#"{"device_class":[5,37,0]}"#).unwrap();
        assert_eq!(scan.device_class, DeviceClass([0x05, 0x25, 0x00]));
        assert!(scan.flush_cache);
    }
}
