//! `status` subcommand: show session, host and config status.

use super::{
    Config, ConfigSummaryJson, GlobalOpts, Result, SessionStatusJson, StatusOutput, kv,
    kv_indent, kv_width, led, load_config, open_session, profile_path,
};

/// Connect to the host and describe the resulting session. Connection
/// problems are reported, not propagated.
fn collect_session_status(
    opts: &GlobalOpts,
    config: &Config,
) -> std::result::Result<SessionStatusJson, String> {
    let session = open_session(opts, config).map_err(|e| e.to_string())?;
    let devices = session
        .devices()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|d| d.category())
        .collect();
    Ok(SessionStatusJson {
        state: session.state(),
        host_state: session.host_session_state(),
        protocol: session.protocol_details().copied(),
        exclusive: session.has_exclusive_access(),
        devices,
    })
}

fn config_summary(config: &Config) -> ConfigSummaryJson {
    let fill_color = match led::parse_color(&config.fill_color) {
        Ok(c) => led::format_color(c),
        Err(_) => format!("{} (invalid)", config.fill_color),
    };
    ConfigSummaryJson {
        fill_color,
        exclusive_access: config.exclusive_access,
        restore_on_exit: config.restore_on_exit,
    }
}

pub(super) fn cmd_status(opts: &GlobalOpts) -> Result<()> {
    let config = load_config(opts.config.as_deref());
    let profile = profile_path(opts, &config).map(|p| p.display().to_string());
    let (session, error) = match collect_session_status(opts, &config) {
        Ok(s) => (Some(s), None),
        Err(e) => (None, Some(e)),
    };

    let output = StatusOutput {
        version: env!("CARGO_PKG_VERSION").to_string(),
        host_profile: profile,
        session,
        error,
        config: config_summary(&config),
    };

    if opts.json {
        return super::print_json(&output);
    }

    let w = kv_width(
        &["Version:", "Host profile:", "Session:"],
        &[
            "Client:",
            "Server:",
            "Host:",
            "Host state:",
            "Exclusive:",
            "Devices:",
            "Fill color:",
            "Exclusive access:",
            "Restore on exit:",
        ],
    );

    kv("Version:", &output.version, w);
    kv(
        "Host profile:",
        output.host_profile.as_deref().unwrap_or("(none)"),
        w,
    );
    match (&output.session, &output.error) {
        (Some(s), _) => {
            kv("Session:", s.state, w);
            if let Some(p) = &s.protocol {
                kv_indent("Client:", p.client_version, w);
                kv_indent("Server:", p.server_version, w);
                kv_indent("Host:", p.server_host_version, w);
            }
            kv_indent("Host state:", s.host_state, w);
            kv_indent("Exclusive:", s.exclusive, w);
            let names: Vec<String> = s.devices.iter().map(|c| c.to_string()).collect();
            let devices = if names.is_empty() {
                "(none)".to_string()
            } else {
                names.join(", ")
            };
            kv_indent("Devices:", devices, w);
        }
        (None, Some(e)) => kv("Session:", format_args!("not connected ({e})"), w),
        (None, None) => kv("Session:", "not connected", w),
    }
    println!();

    println!("Config:");
    kv_indent("Fill color:", &output.config.fill_color, w);
    kv_indent("Exclusive access:", output.config.exclusive_access, w);
    kv_indent("Restore on exit:", output.config.restore_on_exit, w);
    Ok(())
}
