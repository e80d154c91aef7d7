// src/bin/resinfo.rs
//
// Lists every compute platform and device with its index, so the right
// `resource` numbers can be put into a run configuration.

use anyhow::Context;
use log::{debug, info};
use std::io::{self, Write};

use mandelgrid::resource::Capabilities;
use mandelgrid::{HostPlatform, ResourceSelector};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_micros()
        .init();

    let platform = HostPlatform::new();
    let devices = platform.enumerate();
    info!("Enumerated {} device(s)", devices.len());

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut current_platform = None;
    for device in &devices {
        debug!(
            "{}",
            serde_json::to_string(device).context("Failed to encode descriptor")?
        );
        if current_platform != Some(device.index.platform) {
            current_platform = Some(device.index.platform);
            writeln!(out, "Platform {}: {}", device.index.platform, device.platform_name)?;
            writeln!(out, "  Vendor: {}", device.vendor)?;
        }
        writeln!(out, "  Device {}: {}", device.index.device, device.device_name)?;
        writeln!(out, "    Kind: {:?}", device.kind)?;
        writeln!(out, "    Compute units: {}", device.compute_units)?;
        writeln!(
            out,
            "    Double precision: {}",
            yes_no(device.capabilities.contains(Capabilities::FP64))
        )?;
        writeln!(
            out,
            "    Profiling: {}",
            yes_no(device.capabilities.contains(Capabilities::PROFILING))
        )?;
    }

    out.flush().context("Failed to write device list")?;
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
