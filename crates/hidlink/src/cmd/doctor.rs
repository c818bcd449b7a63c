use serde::Serialize;

use crate::cmd::{Context, DoctorArgs};
use crate::config;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: DoctorArgs, ctx: &Context) -> CliResult<i32> {
    let checks = vec![
        platform_transport_check(),
        bluetooth_subsystem_check(),
        adapter_check(ctx.adapter),
        config_check(ctx),
        compiled_features_check(),
    ];

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput { checks, overall };
    print_doctor(&output, ctx.format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("hidlink doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<22} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn platform_transport_check() -> CheckResult {
    if cfg!(target_os = "linux") {
        CheckResult::new(
            "platform_transport",
            CheckStatus::Pass,
            "BlueZ HCI and L2CAP sockets available",
        )
    } else {
        CheckResult::new(
            "platform_transport",
            CheckStatus::Fail,
            "no Bluetooth HID backend on this platform",
        )
    }
}

fn bluetooth_subsystem_check() -> CheckResult {
    #[cfg(target_os = "linux")]
    {
        let path = std::path::Path::new("/sys/class/bluetooth");
        match std::fs::read_dir(path) {
            Ok(entries) => {
                let mut names: Vec<String> = entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect();
                names.sort();
                if names.is_empty() {
                    CheckResult::new("bluetooth_subsystem", CheckStatus::Warn, "no adapters registered")
                } else {
                    CheckResult::new("bluetooth_subsystem", CheckStatus::Info, names.join(", "))
                }
            }
            Err(err) => CheckResult::new(
                "bluetooth_subsystem",
                CheckStatus::Warn,
                format!("{}: {err}", path.display()),
            ),
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        CheckResult::new(
            "bluetooth_subsystem",
            CheckStatus::Skip,
            "not applicable on this platform",
        )
    }
}

fn adapter_check(adapter: Option<u16>) -> CheckResult {
    #[cfg(target_os = "linux")]
    {
        use hidlink_transport::{BluezRadio, Radio};

        let radio = match adapter {
            Some(id) => BluezRadio::with_adapter(id),
            None => BluezRadio::new(),
        };
        let dev_id = match radio.resolve_adapter() {
            Ok(id) => id,
            Err(err) => return CheckResult::new("radio_adapter", CheckStatus::Fail, err.to_string()),
        };
        match radio.open() {
            Ok(_control) => CheckResult::new(
                "radio_adapter",
                CheckStatus::Pass,
                format!("hci{dev_id} control socket opened"),
            ),
            Err(err) => CheckResult::new(
                "radio_adapter",
                CheckStatus::Fail,
                format!("hci{dev_id}: {err}"),
            ),
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = adapter;
        CheckResult::new("radio_adapter", CheckStatus::Skip, "no backend")
    }
}

fn config_check(ctx: &Context) -> CheckResult {
    let Some(path) = ctx.config.as_deref() else {
        return CheckResult::new("config_file", CheckStatus::Skip, "--config not set");
    };
    match config::load(Some(path)) {
        Ok(_) => CheckResult::new(
            "config_file",
            CheckStatus::Pass,
            format!("{} loaded", path.display()),
        ),
        Err(err) => CheckResult::new("config_file", CheckStatus::Fail, err.message),
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = vec!["cli"];
    if cfg!(feature = "sim") {
        features.push("sim");
    }
    CheckResult::new("compiled_features", CheckStatus::Info, features.join(", "))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn doctor_output_has_overall_status() {
        let output = DoctorOutput {
            checks: vec![CheckResult::new("x", CheckStatus::Pass, "ok")],
            overall: "pass",
        };
        let json = serde_json::to_string(&output).expect("doctor output should serialize");
        assert!(json.contains("\"overall\":\"pass\""));
        assert!(json.contains("\"status\":\"pass\""));
    }

    #[test]
    fn missing_config_file_fails_check() {
        let ctx = Context {
            format: OutputFormat::Json,
            config: Some(PathBuf::from("/nonexistent/hidlink.json")),
            adapter: None,
        };
        assert!(matches!(config_check(&ctx).status, CheckStatus::Fail));

        let ctx = Context {
            config: None,
            ..ctx
        };
        assert!(matches!(config_check(&ctx).status, CheckStatus::Skip));
    }
}
