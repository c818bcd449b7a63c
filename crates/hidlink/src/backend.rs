use hidlink_transport::{ChannelTransport, Radio};

use crate::exit::CliResult;

/// The radio and channel transport for this platform.
pub struct Backend {
    pub radio: Box<dyn Radio>,
    pub transport: Box<dyn ChannelTransport>,
}

#[cfg(target_os = "linux")]
pub fn open(adapter: Option<u16>) -> CliResult<Backend> {
    use hidlink_transport::{BluezRadio, BluezTransport};

    let radio = match adapter {
        Some(id) => BluezRadio::with_adapter(id),
        None => BluezRadio::new(),
    };
    Ok(Backend {
        radio: Box::new(radio),
        transport: Box::new(BluezTransport::new()),
    })
}

#[cfg(not(target_os = "linux"))]
pub fn open(_adapter: Option<u16>) -> CliResult<Backend> {
    Err(crate::exit::CliError::new(
        crate::exit::TRANSPORT_ERROR,
        "no Bluetooth HID backend on this platform (BlueZ sockets require Linux)",
    ))
}

/// Parse `hciN` or a bare adapter index.
pub fn parse_adapter(input: &str) -> Result<u16, String> {
    let index = input.trim().strip_prefix("hci").unwrap_or(input.trim());
    index
        .parse()
        .map_err(|_| format!("expected an adapter like hci0, got {input:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_names() {
        assert_eq!(parse_adapter("hci0"), Ok(0));
        assert_eq!(parse_adapter("hci12"), Ok(12));
        assert_eq!(parse_adapter("3"), Ok(3));
        assert!(parse_adapter("hci").is_err());
        assert!(parse_adapter("usb0").is_err());
    }
}
