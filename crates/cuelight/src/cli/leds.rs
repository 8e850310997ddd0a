//! `leds` subcommand: list the LEDs of one device.

use super::{
    DeviceCategory, DeviceJson, GlobalOpts, LedsOutput, Result, load_config, open_session, plural,
};

pub(super) fn cmd_leds(opts: &GlobalOpts, category: DeviceCategory) -> Result<()> {
    let config = load_config(opts.config.as_deref());
    let session = open_session(opts, &config)?;
    let device = session.device(category)?;

    if opts.json {
        return super::print_json(&LedsOutput {
            device: DeviceJson::from_device(device),
            leds: device.leds().cloned().collect(),
        });
    }

    let count = device.led_map().len();
    println!(
        "{category} {} ({}): {count} LED{}",
        device.model(),
        device.id(),
        plural(count)
    );
    if count == 0 {
        return Ok(());
    }
    println!();
    println!("  {:>5}  {:>16}  Color", "Id", "Center");
    for led in device.leds() {
        let (cx, cy) = led.rect().center();
        let center = format!("({cx:.1}, {cy:.1})");
        println!("  {:>5}  {center:>16}  {}", led.id(), led.color());
    }
    Ok(())
}
