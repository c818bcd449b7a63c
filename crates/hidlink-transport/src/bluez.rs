//! BlueZ (Linux kernel Bluetooth stack) backend.
//!
//! Inquiry runs over a raw HCI socket bound to the adapter; channels are
//! L2CAP `SOCK_SEQPACKET` sockets. Every descriptor is an [`OwnedFd`], so
//! dropping a handle closes it.

use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::time::Duration;

use tracing::{debug, info};

use crate::addr::{BdAddr, DeviceClass, ScanResult};
use crate::error::{Result, TransportError};
use crate::traits::{Channel, ChannelTransport, InquiryParams, Radio, RadioControl};

const BTPROTO_L2CAP: libc::c_int = 0;
const BTPROTO_HCI: libc::c_int = 1;

const HCI_MAX_DEV: usize = 16;
/// Bit index of the "adapter is up" flag in `hci_dev_req.dev_opt`.
const HCI_UP: u32 = 0;
const HCI_CHANNEL_RAW: u16 = 0;

// _IOR('H', 210, int) and _IOR('H', 240, int)
const HCIGETDEVLIST: u32 = 0x8004_48d2;
const HCIINQUIRY: u32 = 0x8004_48f0;

const IREQ_CACHE_FLUSH: u16 = 0x0001;
/// General inquiry access code.
const GIAC_LAP: [u8; 3] = [0x33, 0x8b, 0x9e];

/// `struct hci_inquiry_req` is 9 bytes of fields padded to 10.
const INQUIRY_REQ_SIZE: usize = 10;
/// `struct inquiry_info` is packed.
const INQUIRY_INFO_SIZE: usize = 14;

#[repr(C)]
struct SockaddrHci {
    hci_family: libc::sa_family_t,
    hci_dev: u16,
    hci_channel: u16,
}

#[repr(C)]
struct SockaddrL2 {
    l2_family: libc::sa_family_t,
    l2_psm: u16,
    l2_bdaddr: [u8; 6],
    l2_cid: u16,
    l2_bdaddr_type: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct HciDevReq {
    dev_id: u16,
    dev_opt: u32,
}

#[repr(C)]
struct HciDevListReq {
    dev_num: u16,
    dev_req: [HciDevReq; HCI_MAX_DEV],
}

fn cvt(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

fn bt_socket(kind: libc::c_int, proto: libc::c_int) -> io::Result<OwnedFd> {
    // SAFETY: plain socket(2) call; a non-negative return is a fresh
    // descriptor that nothing else owns.
    let fd = cvt(unsafe { libc::socket(libc::AF_BLUETOOTH, kind | libc::SOCK_CLOEXEC, proto) })?;
    // SAFETY: `fd` was just returned by socket(2) and is owned here.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Equivalent of `hci_get_route(NULL)`: the first adapter that is up.
fn first_up_adapter() -> io::Result<u16> {
    let sock = bt_socket(libc::SOCK_RAW, BTPROTO_HCI)?;

    let mut list = HciDevListReq {
        dev_num: HCI_MAX_DEV as u16,
        dev_req: [HciDevReq::default(); HCI_MAX_DEV],
    };
    // SAFETY: `list` is a valid, writable `hci_dev_list_req` sized for
    // HCI_MAX_DEV entries, which is what `dev_num` advertises.
    cvt(unsafe {
        libc::ioctl(
            sock.as_raw_fd(),
            HCIGETDEVLIST as _,
            (&mut list as *mut HciDevListReq).cast::<libc::c_void>(),
        )
    })?;

    let count = (list.dev_num as usize).min(HCI_MAX_DEV);
    list.dev_req[..count]
        .iter()
        .find(|req| req.dev_opt & (1 << HCI_UP) != 0)
        .map(|req| req.dev_id)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no bluetooth adapter is up"))
}

fn open_adapter(dev_id: u16) -> io::Result<OwnedFd> {
    let sock = bt_socket(libc::SOCK_RAW, BTPROTO_HCI)?;
    let addr = SockaddrHci {
        hci_family: libc::AF_BLUETOOTH as libc::sa_family_t,
        hci_dev: dev_id,
        hci_channel: HCI_CHANNEL_RAW,
    };
    // SAFETY: `addr` is a valid `sockaddr_hci` and the length matches it.
    cvt(unsafe {
        libc::bind(
            sock.as_raw_fd(),
            (&addr as *const SockaddrHci).cast::<libc::sockaddr>(),
            mem::size_of::<SockaddrHci>() as libc::socklen_t,
        )
    })?;
    Ok(sock)
}

/// Radio adapter access through the kernel HCI socket interface.
#[derive(Debug, Clone, Default)]
pub struct BluezRadio {
    adapter: Option<u16>,
}

impl BluezRadio {
    /// Use the first adapter that is up.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific adapter (`hciN` → `N`).
    pub fn with_adapter(adapter: u16) -> Self {
        Self {
            adapter: Some(adapter),
        }
    }

    /// Resolve the adapter this radio would open, without opening it.
    pub fn resolve_adapter(&self) -> Result<u16> {
        match self.adapter {
            Some(id) => Ok(id),
            None => first_up_adapter().map_err(TransportError::AdapterUnavailable),
        }
    }
}

impl Radio for BluezRadio {
    fn open(&self) -> Result<Box<dyn RadioControl>> {
        let dev_id = self.resolve_adapter()?;
        let fd = open_adapter(dev_id).map_err(TransportError::AdapterUnavailable)?;
        debug!(adapter = dev_id, "opened hci control socket");
        Ok(Box::new(BluezControl { fd, dev_id }))
    }
}

/// Open HCI control socket. Closed on drop.
#[derive(Debug)]
pub struct BluezControl {
    fd: OwnedFd,
    dev_id: u16,
}

impl RadioControl for BluezControl {
    fn inquiry(&mut self, params: &InquiryParams) -> Result<Vec<ScanResult>> {
        let (mut buf, max) = inquiry_request(self.dev_id, params);

        // SAFETY: `buf` holds a `hci_inquiry_req` followed by room for
        // `max` packed `inquiry_info` records, and `num_rsp` is never 0
        // (which the kernel would widen to 255).
        cvt(unsafe {
            libc::ioctl(
                self.fd.as_raw_fd(),
                HCIINQUIRY as _,
                buf.as_mut_ptr().cast::<libc::c_void>(),
            )
        })
        .map_err(TransportError::Inquiry)?;

        let returned = (buf[8] as usize).min(max);
        let results = buf[INQUIRY_REQ_SIZE..]
            .chunks_exact(INQUIRY_INFO_SIZE)
            .take(returned)
            .map(|info| {
                let mut bdaddr = [0u8; 6];
                bdaddr.copy_from_slice(&info[0..6]);
                ScanResult {
                    address: BdAddr::from_le_bytes(bdaddr),
                    class: DeviceClass([info[9], info[10], info[11]]),
                }
            })
            .collect();
        Ok(results)
    }
}

/// Kernel cap on responses per inquiry; also what it uses for `num_rsp == 0`.
const MAX_INQUIRY_RESPONSES: u8 = 255;

/// Build the `HCIINQUIRY` argument buffer. Returns it together with the
/// number of `inquiry_info` records it has room for, which is also the
/// `num_rsp` the kernel will honor.
fn inquiry_request(dev_id: u16, params: &InquiryParams) -> (Vec<u8>, usize) {
    let num_rsp = match params.max_responses {
        0 => MAX_INQUIRY_RESPONSES,
        n => n,
    };
    let max = num_rsp as usize;
    let mut buf = vec![0u8; INQUIRY_REQ_SIZE + max * INQUIRY_INFO_SIZE];

    let flags = if params.flush_cache { IREQ_CACHE_FLUSH } else { 0 };
    buf[0..2].copy_from_slice(&dev_id.to_ne_bytes());
    buf[2..4].copy_from_slice(&flags.to_ne_bytes());
    buf[4..7].copy_from_slice(&GIAC_LAP);
    buf[7] = params.length;
    buf[8] = num_rsp;
    (buf, max)
}

/// L2CAP channel transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct BluezTransport;

impl BluezTransport {
    pub fn new() -> Self {
        Self
    }
}

impl ChannelTransport for BluezTransport {
    fn open(&self, address: BdAddr, psm: u16) -> Result<Box<dyn Channel>> {
        let connect_err = |source| TransportError::Connect {
            address,
            psm,
            source,
        };

        let fd = bt_socket(libc::SOCK_SEQPACKET, BTPROTO_L2CAP).map_err(connect_err)?;
        let addr = SockaddrL2 {
            l2_family: libc::AF_BLUETOOTH as libc::sa_family_t,
            l2_psm: psm.to_le(),
            l2_bdaddr: address.to_le_bytes(),
            l2_cid: 0,
            l2_bdaddr_type: 0,
        };
        // SAFETY: `addr` is a valid `sockaddr_l2` and the length matches it.
        cvt(unsafe {
            libc::connect(
                fd.as_raw_fd(),
                (&addr as *const SockaddrL2).cast::<libc::sockaddr>(),
                mem::size_of::<SockaddrL2>() as libc::socklen_t,
            )
        })
        .map_err(connect_err)?;

        info!(%address, psm, "l2cap channel connected");
        Ok(Box::new(L2capChannel { fd, address, psm }))
    }
}

/// One connected L2CAP socket. Closed on drop.
#[derive(Debug)]
pub struct L2capChannel {
    fd: OwnedFd,
    address: BdAddr,
    psm: u16,
}

impl Channel for L2capChannel {
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        let millis = timeout.as_micros().div_ceil(1000).min(libc::c_int::MAX as u128);
        let mut pfd = libc::pollfd {
            fd: self.fd.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        // SAFETY: `pfd` is a single valid pollfd.
        let ready = unsafe { libc::poll(&mut pfd, 1, millis as libc::c_int) };
        match ready {
            0 => Ok(false),
            n if n > 0 => Ok(true),
            _ => {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    Ok(false)
                } else {
                    debug!(address = %self.address, psm = self.psm, error = %err, "poll failed");
                    Err(err)
                }
            }
        }
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
        let n = unsafe { libc::read(self.fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        // SAFETY: `buf` is valid for reads of `buf.len()` bytes.
        let n = unsafe { libc::write(self.fd.as_raw_fd(), buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sockaddr_layouts_match_kernel() {
        assert_eq!(mem::size_of::<SockaddrHci>(), 6);
        assert_eq!(mem::size_of::<SockaddrL2>(), 14);
        assert_eq!(mem::offset_of!(SockaddrL2, l2_psm), 2);
        assert_eq!(mem::offset_of!(SockaddrL2, l2_bdaddr), 4);
        assert_eq!(mem::offset_of!(SockaddrL2, l2_cid), 10);
        assert_eq!(mem::offset_of!(SockaddrL2, l2_bdaddr_type), 12);
    }

    #[test]
    fn dev_list_layout_matches_kernel() {
        assert_eq!(mem::size_of::<HciDevReq>(), 8);
        assert_eq!(mem::offset_of!(HciDevListReq, dev_req), 4);
        assert_eq!(mem::size_of::<HciDevListReq>(), 4 + 8 * HCI_MAX_DEV);
    }

    #[test]
    fn inquiry_buffer_covers_kernel_response_count() {
        for requested in [0u8, 1, 8, 128, 255] {
            let params = InquiryParams {
                max_responses: requested,
                ..InquiryParams::default()
            };
            let (buf, max) = inquiry_request(0, &params);
            let num_rsp = buf[8];
            // hci_inquiry treats num_rsp == 0 as 255.
            let kernel_max = if num_rsp == 0 { 255 } else { num_rsp as usize };
            assert_eq!(max, kernel_max, "requested {requested}");
            assert!(buf.len() >= INQUIRY_REQ_SIZE + kernel_max * INQUIRY_INFO_SIZE);
        }
    }

    #[test]
    fn inquiry_request_header() {
        let params = InquiryParams {
            length: 2,
            max_responses: 4,
            flush_cache: true,
        };
        let (buf, max) = inquiry_request(1, &params);
        assert_eq!(max, 4);
        assert_eq!(buf.len(), INQUIRY_REQ_SIZE + 4 * INQUIRY_INFO_SIZE);
        assert_eq!(&buf[0..2], &1u16.to_ne_bytes());
        assert_eq!(&buf[2..4], &IREQ_CACHE_FLUSH.to_ne_bytes());
        assert_eq!(&buf[4..7], &GIAC_LAP);
        assert_eq!(buf[7], 2);
        assert_eq!(buf[8], 4);
    }

    #[test]
    fn explicit_adapter_resolves_without_probing() {
        assert_eq!(BluezRadio::with_adapter(3).resolve_adapter().unwrap(), 3);
    }

    #[test]
    fn open_with_unreachable_adapter_reports_unavailable() {
        // hci adapters are numbered from 0; this index is never present.
        let radio = BluezRadio::with_adapter(u16::MAX - 1);
        assert!(matches!(
            radio.open(),
            Err(TransportError::AdapterUnavailable(_))
        ));
    }
}
