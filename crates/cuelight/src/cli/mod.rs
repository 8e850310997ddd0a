//! CLI subcommands: device listing, LED inspection and lighting.

mod config_cmd;
mod devices;
mod leds;
mod set;
mod status;
mod symbol;

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

pub(super) use cuelight_lib::config::Config;
pub(super) use cuelight_lib::error::{CueError, Result};
pub(super) use cuelight_lib::protocol::ProtocolDetails;
pub(super) use cuelight_lib::{
    Device, DeviceCategory, Led, LedGroup, LedId, Rgba, Session, SessionState, SimulatedHost,
    host::HostSessionState, led,
};

const PADDING: usize = 2;

/// Options shared by every subcommand.
pub struct GlobalOpts {
    pub json: bool,
    pub profile: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

pub(super) fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CueError::Config(format!("JSON output failed: {e}")))?;
    println!("{text}");
    Ok(())
}

pub(super) fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

// ── Session plumbing ──

/// Load the config from `custom_path`, or from the platform default.
pub(super) fn load_config(custom_path: Option<&Path>) -> Config {
    match custom_path {
        Some(path) => {
            let (config, warnings) = Config::load_from(path);
            for w in &warnings {
                log::warn!("{w}");
            }
            config
        }
        None => Config::load(),
    }
}

/// The host profile to run against: `--profile` wins over the config.
pub(super) fn profile_path(opts: &GlobalOpts, config: &Config) -> Option<PathBuf> {
    opts.profile.clone().or_else(|| config.host_profile_path())
}

/// Load the host profile and open a ready session on it.
pub(super) fn open_session(opts: &GlobalOpts, config: &Config) -> Result<Session<SimulatedHost>> {
    let path = profile_path(opts, config).ok_or_else(|| {
        CueError::Config("no lighting host available (pass --profile or set host_profile)".into())
    })?;
    log::debug!("loading host profile {}", path.display());
    let host = SimulatedHost::load_profile(&path)?;
    let mut session = Session::new(host);
    session.connect(config.exclusive_access)?;
    Ok(session)
}

fn parse_category(s: &str) -> std::result::Result<DeviceCategory, String> {
    s.parse()
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct DeviceJson {
    pub category: DeviceCategory,
    pub model: String,
    pub id: String,
    pub serial: String,
    pub led_count: usize,
    pub channel_count: usize,
    pub access: String,
}

impl DeviceJson {
    pub fn from_device(device: &Device) -> Self {
        let info = device.info();
        DeviceJson {
            category: device.category(),
            model: info.model.clone(),
            id: info.id.clone(),
            serial: info.serial.clone(),
            led_count: device.led_map().len(),
            channel_count: info.channel_count,
            access: info.access.to_string(),
        }
    }
}

#[derive(Serialize)]
pub(super) struct DevicesOutput {
    pub count: usize,
    pub devices: Vec<DeviceJson>,
}

#[derive(Serialize)]
pub(super) struct LedsOutput {
    pub device: DeviceJson,
    pub leds: Vec<Led>,
}

#[derive(Serialize)]
pub(super) struct LedColorJson {
    pub id: LedId,
    pub color: Rgba,
}

#[derive(Serialize)]
pub(super) struct SetOutput {
    pub category: DeviceCategory,
    pub color: Rgba,
    pub requested: usize,
    pub sent: usize,
    pub applied: Vec<LedColorJson>,
    pub restored: Option<usize>,
}

#[derive(Serialize)]
pub(super) struct SymbolOutput {
    pub symbol: char,
    pub led: Option<LedId>,
    pub center: Option<(f64, f64)>,
}

#[derive(Serialize)]
pub(super) struct StatusOutput {
    pub version: String,
    pub host_profile: Option<String>,
    pub session: Option<SessionStatusJson>,
    pub error: Option<String>,
    pub config: ConfigSummaryJson,
}

#[derive(Serialize)]
pub(super) struct SessionStatusJson {
    pub state: SessionState,
    pub host_state: HostSessionState,
    pub protocol: Option<ProtocolDetails>,
    pub exclusive: bool,
    pub devices: Vec<DeviceCategory>,
}

#[derive(Serialize)]
pub(super) struct ConfigSummaryJson {
    pub fill_color: String,
    pub exclusive_access: bool,
    pub restore_on_exit: bool,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub problems: Vec<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the devices the lighting host exposes
    Devices,

    /// List the LEDs of one device with their positions and colors
    Leds {
        /// Device category (keyboard, mouse, headset, mousemat, headset-stand)
        #[arg(value_parser = parse_category)]
        category: DeviceCategory,
    },

    /// Light LEDs of one device with a solid color
    Set {
        /// Device category (keyboard, mouse, headset, mousemat, headset-stand)
        #[arg(value_parser = parse_category)]
        category: DeviceCategory,
        /// LED ids, comma separated
        #[arg(long, value_delimiter = ',')]
        leds: Vec<LedId>,
        /// Key symbols to resolve on the keyboard (e.g. "wasd")
        #[arg(long)]
        symbols: Option<String>,
        /// Every LED of the device
        #[arg(long)]
        all: bool,
        /// Color (hex or name); defaults to `fill_color` from the config
        #[arg(long)]
        color: Option<String>,
    },

    /// Resolve a keyboard key symbol to its LED
    Symbol {
        /// A single key symbol
        symbol: char,
    },

    /// Show session and host status
    Status,

    /// Show current configuration and file paths
    Config,
}

pub fn run(cmd: Command, opts: &GlobalOpts) -> Result<()> {
    match cmd {
        Command::Devices => devices::cmd_devices(opts),
        Command::Leds { category } => leds::cmd_leds(opts, category),
        Command::Set {
            category,
            leds,
            symbols,
            all,
            color,
        } => set::cmd_set(
            opts,
            set::Selection {
                category,
                leds,
                symbols,
                all,
            },
            color.as_deref(),
        ),
        Command::Symbol { symbol } => symbol::cmd_symbol(opts, symbol),
        Command::Status => status::cmd_status(opts),
        Command::Config => config_cmd::cmd_config(opts),
    }
}

#[cfg(test)]
mod format_tests {
    use super::*;

    #[test]
    fn kv_width_top_only() {
        let w = kv_width(&["Short:", "Longer key:"], &[]);
        // "Longer key:" = 11 + PADDING = 13
        assert_eq!(w, 13);
    }

    #[test]
    fn kv_width_indent_drives_width() {
        let w = kv_width(&["A:"], &["Restore on exit:"]);
        // 16 + PADDING + 2 = 20
        assert_eq!(w, 20);
    }

    #[test]
    fn kv_width_empty_both() {
        assert_eq!(kv_width(&[], &[]), 0);
    }

    #[test]
    fn values_align_across_levels() {
        let w = kv_width(&["Session:"], &["Host state:"]);
        let top = format_kv("Session:", "V", w);
        let indent = format!("  {:<width$}{}", "Host state:", "V", width = w - 2);
        assert_eq!(top.find('V'), indent.find('V'));
    }

    #[test]
    fn format_kv_overlong_key_gets_no_padding() {
        assert_eq!(format_kv("ExactWidth:", "val", 10), "ExactWidth:val");
    }

    #[test]
    fn plural_suffix() {
        assert_eq!(plural(0), "s");
        assert_eq!(plural(1), "");
        assert_eq!(plural(2), "s");
    }
}

#[cfg(test)]
mod option_tests {
    use super::*;

    fn opts(profile: Option<&str>) -> GlobalOpts {
        GlobalOpts {
            json: false,
            profile: profile.map(PathBuf::from),
            config: None,
        }
    }

    #[test]
    fn flag_profile_overrides_config() {
        let config = Config {
            host_profile: "/from/config.toml".into(),
            ..Config::default()
        };
        assert_eq!(
            profile_path(&opts(Some("/from/flag.toml")), &config),
            Some(PathBuf::from("/from/flag.toml"))
        );
        assert_eq!(
            profile_path(&opts(None), &config),
            Some(PathBuf::from("/from/config.toml"))
        );
    }

    #[test]
    fn no_profile_means_no_host() {
        match open_session(&opts(None), &Config::default()) {
            Err(e) => assert!(e.to_string().contains("no lighting host available")),
            Ok(_) => panic!("expected an error without a host profile"),
        }
    }

    #[test]
    fn category_parser_accepts_spellings() {
        assert_eq!(
            parse_category("headset_stand").unwrap(),
            DeviceCategory::HeadsetStand
        );
        assert!(parse_category("toaster").is_err());
    }

    #[test]
    fn load_config_from_custom_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "fill_color = \"red\"\n").unwrap();
        assert_eq!(load_config(Some(&path)).fill_color, "red");
    }
}

#[cfg(test)]
mod json_struct_tests {
    use super::*;

    #[test]
    fn config_summary_json_has_expected_fields() {
        let summary = ConfigSummaryJson {
            fill_color: "#FFFFFF".into(),
            exclusive_access: false,
            restore_on_exit: true,
        };
        let json = serde_json::to_value(&summary).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert!(obj.contains_key("fill_color"));
        assert!(obj.contains_key("exclusive_access"));
        assert!(obj.contains_key("restore_on_exit"));
    }

    #[test]
    fn status_output_without_session() {
        let output = StatusOutput {
            version: "0.1.0".into(),
            host_profile: None,
            session: None,
            error: Some("no lighting host available".into()),
            config: ConfigSummaryJson {
                fill_color: "#FFFFFF".into(),
                exclusive_access: false,
                restore_on_exit: true,
            },
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert_eq!(parsed["version"], "0.1.0");
        assert!(parsed["session"].is_null());
        assert!(parsed["host_profile"].is_null());
        assert_eq!(parsed["config"]["restore_on_exit"], true);
    }

    #[test]
    fn set_output_serializes_colors_as_hex() {
        let output = SetOutput {
            category: DeviceCategory::HeadsetStand,
            color: Rgba::rgb(255, 0, 0),
            requested: 1,
            sent: 1,
            applied: vec![LedColorJson {
                id: 4,
                color: Rgba::rgb(255, 0, 0),
            }],
            restored: None,
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert_eq!(parsed["category"], "headset-stand");
        assert_eq!(parsed["color"], "#FF0000");
        assert_eq!(parsed["applied"][0]["id"], 4);
        assert!(parsed["restored"].is_null());
    }

    #[test]
    fn symbol_output_without_led() {
        let output = SymbolOutput {
            symbol: 'q',
            led: None,
            center: None,
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert_eq!(parsed["symbol"], "q");
        assert!(parsed["led"].is_null());
    }
}
