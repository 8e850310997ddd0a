//! `set` subcommand: light a selection of LEDs with a solid color.

use super::{
    DeviceCategory, GlobalOpts, LedColorJson, LedGroup, LedId, Result, SetOutput, led,
    load_config, open_session, plural,
};

/// Which LEDs of which device to light.
pub(super) struct Selection {
    pub category: DeviceCategory,
    pub leds: Vec<LedId>,
    pub symbols: Option<String>,
    pub all: bool,
}

pub(super) fn cmd_set(opts: &GlobalOpts, selection: Selection, color: Option<&str>) -> Result<()> {
    let config = load_config(opts.config.as_deref());
    let color = match color {
        Some(c) => led::parse_color(c)?,
        None => config.fill_rgba()?,
    };
    let mut session = open_session(opts, &config)?;
    let category = selection.category;

    let mut ids = selection.leds;
    if let Some(symbols) = &selection.symbols {
        if category == DeviceCategory::Keyboard {
            for ch in symbols.chars().filter(|c| !c.is_whitespace()) {
                match session.led_for_symbol(ch)? {
                    Some(led) => ids.push(led.id()),
                    None => log::warn!("no keyboard LED for {ch:?}"),
                }
            }
        } else {
            log::warn!("--symbols only resolves keyboard keys (ignored for {category})");
        }
    }

    let device = session.device_mut(category)?;
    if selection.all {
        ids.extend(device.led_map().ids());
    }
    for id in &ids {
        if device.led(*id).is_none() {
            log::warn!("{category} has no LED {id} (skipped)");
        }
    }
    let mut group = LedGroup::with_leds(device, true, ids);
    group.set_fill(Some(color));
    let requested = group.len();
    if requested == 0 {
        log::warn!("no LEDs selected, nothing to send");
    }

    let sent = session.flush(category, &[&group])?;
    let device_id = session.device(category)?.id().to_string();
    let applied: Vec<LedColorJson> = session
        .host()
        .led_colors(&device_id)
        .into_iter()
        .filter(|c| group.contains_led_id(c.id))
        .map(|c| LedColorJson {
            id: c.id,
            color: c.rgba(),
        })
        .collect();

    let restored = if config.restore_on_exit {
        Some(session.restore(category)?)
    } else {
        None
    };

    if opts.json {
        return super::print_json(&SetOutput {
            category,
            color,
            requested,
            sent,
            applied,
            restored,
        });
    }

    let model = session.device(category)?.model().to_string();
    println!(
        "Sent {sent} LED update{} to {category} {model} ({color}).",
        plural(sent)
    );
    if let Some(n) = restored {
        println!("Restored {n} LED{} on exit.", plural(n));
    }
    Ok(())
}
