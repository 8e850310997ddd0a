//! `symbol` subcommand: resolve a key symbol to a keyboard LED.

use super::{GlobalOpts, Result, SymbolOutput, load_config, open_session};

pub(super) fn cmd_symbol(opts: &GlobalOpts, symbol: char) -> Result<()> {
    let config = load_config(opts.config.as_deref());
    let session = open_session(opts, &config)?;
    let led = session.led_for_symbol(symbol)?;

    if opts.json {
        return super::print_json(&SymbolOutput {
            symbol,
            led: led.map(|l| l.id()),
            center: led.map(|l| l.rect().center()),
        });
    }

    match led {
        Some(led) => {
            let (cx, cy) = led.rect().center();
            println!("{symbol:?} -> LED {} at ({cx:.1}, {cy:.1})", led.id());
        }
        None => println!("No keyboard LED for {symbol:?}."),
    }
    Ok(())
}
