// ABOUTME: Command-line router that watches for GSM modems and logs every SMS and caller it sees
// ABOUTME: Demonstrates wiring a Deliver backend, port discovery and graceful Ctrl-C shutdown

//! # SMS Router
//!
//! Runs a modem session on every CH340 serial adapter (or on the ports given
//! with `--port`) and prints each notification instead of mailing it.
//!
//! ## Usage
//!
//! ```bash
//! # Scan for CH340 adapters every 10 seconds
//! cargo run --example sms_router
//!
//! # Fixed ports, verbose AT traffic
//! cargo run --example sms_router -- -d --port /dev/ttyUSB0 --port /dev/ttyUSB1
//!
//! # Another USB bridge (FTDI FT232R)
//! cargo run --example sms_router -- --vendor-id 0403 --product-id 6001
//! ```

use argh::FromArgs;
use sms_router::router::{StaticPorts, UsbPortScanner};
use sms_router::{Deliver, DeliveryError, Notification, Router, RouterConfig, SessionConfig};
use std::error::Error;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// Route SMS and caller-id notifications from GSM modems
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// serial port to use instead of USB discovery (repeatable)
    #[argh(option, short = 'p')]
    port: Vec<String>,

    /// USB vendor id in hex (default: 1a86)
    #[argh(option, from_str_fn(parse_hex_id))]
    vendor_id: Option<u16>,

    /// USB product id in hex (default: 7523)
    #[argh(option, from_str_fn(parse_hex_id))]
    product_id: Option<u16>,

    /// seconds between discovery passes (default: 10)
    #[argh(option)]
    discovery_interval: Option<u64>,

    /// serial baud rate (default: 9600)
    #[argh(option)]
    baud: Option<u32>,
}

fn parse_hex_id(value: &str) -> Result<u16, String> {
    u16::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|e| format!("invalid USB id {value:?}: {e}"))
}

/// Backend that writes notifications to the log
struct LogBackend;

impl Deliver for LogBackend {
    fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        info!("{}\n{}", notification.subject(), notification.body());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging { Level::DEBUG } else { Level::INFO })
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut config = RouterConfig::default();
    let vendor_id = cli_args.vendor_id.unwrap_or(config.usb_vendor_id);
    let product_id = cli_args.product_id.unwrap_or(config.usb_product_id);
    config = config.with_usb_ids(vendor_id, product_id);
    if let Some(seconds) = cli_args.discovery_interval {
        config = config.with_discovery_interval(Duration::from_secs(seconds));
    }
    if let Some(baud) = cli_args.baud {
        config = config.with_session(SessionConfig::default().with_baud_rate(baud));
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl-C: {e}");
        }
        info!("Ctrl-C received");
    };

    if cli_args.port.is_empty() {
        let scanner: UsbPortScanner = config.usb_scanner();
        info!(
            "Watching for USB modems {:04x}:{:04x}",
            scanner.vendor_id, scanner.product_id
        );
        Router::new(config, scanner, LogBackend, Handle::current())
            .run(shutdown)
            .await;
    } else {
        info!("Using ports {:?}", cli_args.port);
        Router::new(config, StaticPorts(cli_args.port), LogBackend, Handle::current())
            .run(shutdown)
            .await;
    }

    info!("Bye");
    Ok(())
}
