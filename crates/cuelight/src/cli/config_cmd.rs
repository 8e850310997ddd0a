//! `config` subcommand: show current configuration and file paths.

use super::{Config, ConfigOutput, GlobalOpts, Result, kv, kv_indent, kv_width, led, load_config};

pub(super) fn cmd_config(opts: &GlobalOpts) -> Result<()> {
    let custom_path = opts.config.as_deref();
    let config = load_config(custom_path);
    let config_path = custom_path.map(|p| p.to_path_buf()).or_else(Config::path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());
    let problems: Vec<String> = match config.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
    };

    if opts.json {
        return super::print_json(&ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config,
            problems,
        });
    }

    let w = kv_width(
        &["Config file:"],
        &[
            "fill_color:",
            "exclusive_access:",
            "host_profile:",
            "restore_on_exit:",
        ],
    );

    match &config_path {
        Some(p) if config_exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Settings:");
    let color_display = match led::parse_color(&config.fill_color) {
        Ok(val) => format!("{} -> {}", config.fill_color, led::format_color(val)),
        Err(_) => format!("{} (invalid)", config.fill_color),
    };
    kv_indent("fill_color:", &color_display, w);
    kv_indent("exclusive_access:", config.exclusive_access, w);
    let profile = if config.host_profile.trim().is_empty() {
        "(none)"
    } else {
        config.host_profile.as_str()
    };
    kv_indent("host_profile:", profile, w);
    kv_indent("restore_on_exit:", config.restore_on_exit, w);

    if !problems.is_empty() {
        println!();
        println!("Problems:");
        for p in &problems {
            println!("  {p}");
        }
    }
    Ok(())
}
