// src/main.rs
use std::path::PathBuf;

use anyhow::Context;

use devmon::config::AppConfig;
use devmon::{engine, gui};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("failed to load configuration")?;

    if config.display.gui {
        gui::run(config)
    } else {
        engine::run_headless(&config).context("monitor stopped with an error")
    }
}
