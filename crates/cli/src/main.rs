//! usbman
//!
//! Command-line manager for removable USB devices on Windows: list
//! present devices, inspect one, show storage volumes, and safely eject.

mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "usbman")]
#[command(
    author,
    version,
    about = "USB device manager - list, inspect, and safely eject removable devices"
)]
#[command(long_about = "
Manage removable USB devices: enumerate what is attached, resolve
vendor/product/serial identifiers and bus topology, and perform a safe
eject that retries up the device's ancestor chain when the storage node
itself refuses.

EXAMPLES:
    # List all present USB devices
    usbman list

    # Show everything known about one device
    usbman info \"USB\\VID_0781&PID_5567\\AA11\"

    # Show storage devices with their mounted volumes
    usbman storage

    # Safely eject a storage device
    usbman eject \"USBSTOR\\DISK&VEN_SANDISK\\AA11\"

CONFIGURATION:
    Configuration is read from the path given with --config, then from
    ~/.config/usbman/config.toml, then built-in defaults.
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List present USB devices
    List,
    /// Show details for one device
    Info {
        /// PnP instance id of the device
        instance_id: String,
    },
    /// List storage devices with their mounted volumes
    Storage,
    /// Safely eject a storage device
    Eject {
        /// PnP instance id of the storage device
        instance_id: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::Config::load(args.config.as_deref())?;

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level.clone());
    logging::setup_logging(&level)?;
    tracing::debug!(?config, "configuration loaded");

    run(args, config)
}

#[cfg(windows)]
fn run(args: Args, config: config::Config) -> Result<()> {
    use anyhow::Context;
    use model::DeviceId;
    use platform::windows::WindowsHost;
    use service::{BaseDeviceService, StorageDeviceService};
    use std::sync::Arc;

    let host = Arc::new(WindowsHost::new()?);
    let base = BaseDeviceService::new(host.clone(), host.clone(), host.clone())
        .with_max_ancestor_depth(config.max_ancestor_depth);
    let mut storage = StorageDeviceService::new(base, host.clone());
    storage.refresh();

    match args.command {
        Command::List => {
            for id in storage.base().list_device_ids() {
                let info = storage.base().get_device_info(&id)?;
                println!(
                    "{:4}:{:4}  {:8}  {}",
                    info.vendor_id.as_deref().unwrap_or("----"),
                    info.product_id.as_deref().unwrap_or("----"),
                    info.usb_version.map(|v| v.label()).unwrap_or("-"),
                    info.description.as_deref().unwrap_or(id.as_str()),
                );
            }
        }
        Command::Info { instance_id } => {
            let id = DeviceId::new(&instance_id)?;
            let info = storage
                .base()
                .get_device_info(&id)
                .context("device no longer present, refresh and retry")?;
            println!("instance id:   {}", info.id);
            println!("vendor id:     {}", info.vendor_id.as_deref().unwrap_or("-"));
            println!("product id:    {}", info.product_id.as_deref().unwrap_or("-"));
            println!("manufacturer:  {}", info.manufacturer.as_deref().unwrap_or("-"));
            println!("product:       {}", info.product.as_deref().unwrap_or("-"));
            println!("serial:        {}", info.serial_number.as_deref().unwrap_or("-"));
            println!(
                "bus/port:      {}/{}",
                info.bus_number.map_or("-".into(), |n| n.to_string()),
                info.port_number.map_or("-".into(), |n| n.to_string()),
            );
            match (info.usb_version, info.speed_mbps) {
                (Some(version), Some(speed)) => {
                    println!("usb version:   {} ({speed} Mbps)", version.label());
                }
                _ => println!("usb version:   -"),
            }
        }
        Command::Storage => {
            for id in storage.list_storage_device_ids() {
                let info = storage.get_storage_device_info(&id)?;
                println!(
                    "{}  {}",
                    info.base.id,
                    info.base.description.as_deref().unwrap_or("-")
                );
                for volume in &info.volumes {
                    println!(
                        "    {:3}  {:6}  {:>10} free of {:>10}  {}",
                        volume.drive_letter.as_deref().unwrap_or("-"),
                        volume.file_system.as_deref().unwrap_or("-"),
                        format_bytes(volume.free_bytes),
                        format_bytes(volume.total_bytes),
                        volume.volume_label.as_deref().unwrap_or(""),
                    );
                }
            }
        }
        Command::Eject { instance_id } => {
            let id = DeviceId::new(&instance_id)?;
            let result = storage
                .eject_device(&id)
                .context("device no longer present, refresh and retry")?;
            if result.success {
                println!("ejected {}", result.attempted_instance_id);
            } else {
                eprintln!(
                    "eject refused (status {:#x}) at {}",
                    result.status.0, result.attempted_instance_id
                );
                if let Some(name) = &result.veto_name {
                    eprintln!("blocked by: {name} ({:?})", result.veto_type);
                }
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

#[cfg(windows)]
fn format_bytes(bytes: Option<u64>) -> String {
    match bytes {
        Some(n) if n >= 1 << 30 => format!("{:.1} GiB", n as f64 / (1u64 << 30) as f64),
        Some(n) if n >= 1 << 20 => format!("{:.1} MiB", n as f64 / (1u64 << 20) as f64),
        Some(n) if n >= 1 << 10 => format!("{:.1} KiB", n as f64 / (1u64 << 10) as f64),
        Some(n) => format!("{n} B"),
        None => "-".to_string(),
    }
}

#[cfg(not(windows))]
fn run(_args: Args, _config: config::Config) -> Result<()> {
    anyhow::bail!("usbman manages Windows PnP devices and requires a Windows host")
}
