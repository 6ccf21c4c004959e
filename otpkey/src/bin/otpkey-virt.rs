//! Virtual otpkey card over UDP
//!
//! Each datagram received on port 8111 is one command; the response is sent
//! to 127.0.0.1:7112. A few datagrams are control messages instead:
//!
//! - `REBOOT` reloads the applications from the store
//! - `TOUCH1` / `TOUCH2` simulate a short / long touch; any typed output is
//!   sent back as a datagram
//! - `FAULT1` / `FAULT0` make every store write fail / succeed again, for
//!   exercising client error handling
//!
//! # Usage
//!
//! ```bash
//! OTPKEY_DATA=/tmp/otpkey RUST_LOG=debug cargo run --bin otpkey-virt
//! ```

use std::net::UdpSocket;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use otpkey::{Device, DeviceConfig, Gesture};

const LISTEN_ADDR: &str = "0.0.0.0:8111";
const REPLY_ADDR: &str = "127.0.0.1:7112";
const POLL_INTERVAL: Duration = Duration::from_millis(10);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let storage_dir = std::env::var("OTPKEY_DATA").unwrap_or_else(|_| "otpkey-data".into());
    let config = DeviceConfig::builder().storage_dir(storage_dir).build();
    let mut device = Device::open(config)?;

    let socket = UdpSocket::bind(LISTEN_ADDR)?;
    socket.set_read_timeout(Some(POLL_INTERVAL))?;
    info!("virtual card listening on {}", LISTEN_ADDR);

    let start = Instant::now();
    let mut datagram = [0u8; 2048];
    loop {
        let now = start.elapsed().as_millis() as u64;
        let mut gesture = None;

        match socket.recv(&mut datagram) {
            Ok(len) => match &datagram[..len] {
                b"REBOOT" => {
                    info!("reboot requested");
                    device.reboot()?;
                    continue;
                }
                b"TOUCH1" => gesture = Some(Gesture::Short),
                b"TOUCH2" => gesture = Some(Gesture::Long),
                b"FAULT1" => device.dispatcher().oath().store().inject_write_fault(true),
                b"FAULT0" => device.dispatcher().oath().store().inject_write_fault(false),
                command => match device.exchange(command, now) {
                    Ok(Some(response)) => {
                        socket.send_to(&response, REPLY_ADDR)?;
                    }
                    Ok(None) => info!("touch the card to continue"),
                    Err(err) => warn!("command dropped: {}", err),
                },
            },
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) => {}
            Err(err) => return Err(err.into()),
        }

        match device.tick(now, gesture) {
            Ok(tick) => {
                if let Some(response) = tick.card_response {
                    socket.send_to(&response, REPLY_ADDR)?;
                }
                if let Some(typed) = tick.typed.filter(|typed| !typed.is_empty()) {
                    socket.send_to(&typed, REPLY_ADDR)?;
                }
            }
            Err(err) => error!("control loop: {}", err),
        }
    }
}
