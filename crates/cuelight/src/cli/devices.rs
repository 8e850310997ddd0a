//! `devices` subcommand: list the devices the host exposes.

use super::{DeviceJson, DevicesOutput, GlobalOpts, Result, load_config, open_session, plural};

pub(super) fn cmd_devices(opts: &GlobalOpts) -> Result<()> {
    let config = load_config(opts.config.as_deref());
    let session = open_session(opts, &config)?;
    let devices: Vec<DeviceJson> = session
        .devices()?
        .iter()
        .map(DeviceJson::from_device)
        .collect();

    if opts.json {
        return super::print_json(&DevicesOutput {
            count: devices.len(),
            devices,
        });
    }

    if devices.is_empty() {
        println!("No devices found.");
        return Ok(());
    }

    println!("Found {} device{}:", devices.len(), plural(devices.len()));
    println!();

    for (i, dev) in devices.iter().enumerate() {
        println!("  [{}] {:<14}{}", i + 1, dev.category.to_string(), dev.model);
        println!("      Id:      {}", dev.id);
        if !dev.serial.is_empty() {
            println!("      Serial:  {}", dev.serial);
        }
        println!("      LEDs:    {}", dev.led_count);
        if dev.channel_count > 0 {
            println!("      Channels: {}", dev.channel_count);
        }
        println!("      Access:  {}", dev.access);
    }

    Ok(())
}
