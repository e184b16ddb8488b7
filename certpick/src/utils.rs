//! Utility functions used by the certpick utility

use std::fs::{self, File};

use home::home_dir;
use log::{error, LevelFilter};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

use certpicklib::{Result, SelectOptions};

use crate::args::CertPickArgs;
#[cfg(target_os = "windows")]
use crate::no_bold::NoBold;
#[cfg(not(target_os = "windows"))]
use colored::Colorize;

/// Configures logging per logging-related elements of the provided [CertPickArgs] instance.
///
/// There are two logging-related options: [logging_config](CertPickArgs::logging_config) and
/// [log_to_console](CertPickArgs::log_to_console). Though these options are mutually exclusive, the
/// `logging_config` option can be used to define a logging configuration that both logs to the
/// console and logs to a file. The `log_to_console` option only emits logs from the Info level.
pub(crate) fn configure_logging(args: &CertPickArgs) {
    let mut logging_configured = false;

    if let Some(logging_config) = &args.logging_config {
        if let Err(e) = log4rs::init_file(logging_config, Default::default()) {
            println!(
                "{}: failed to configure logging using {} with {:?}. Continuing without logging.",
                "ERROR".bold(),
                logging_config,
                e
            );
        } else {
            logging_configured = true;
        }
    }

    if !logging_configured && args.log_to_console {
        // if there's no config, prepare one using stdout
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{m}{n}")))
            .build();
        match Config::builder()
            .appender(Appender::builder().build("stdout", Box::new(stdout)))
            .build(Root::builder().appender("stdout").build(LevelFilter::Info))
        {
            Ok(config) => {
                let handle = log4rs::init_config(config);
                if let Err(e) = handle {
                    println!(
                        "{}: failed to configure logging for stdout with {:?}. Continuing without logging.",
                        "ERROR".bold(), e
                    );
                }
            }
            Err(e) => {
                println!("{}: failed to prepare default logging configuration with {:?}. Continuing without logging", "ERROR".bold(), e);
            }
        }
    }
}

/// Read saved options from (home dir)/.certpick/certpick.cfg, which is a JSON-formatted representation
/// of a [SelectOptions] structure.
fn read_saved_options_or_default() -> SelectOptions {
    if let Some(home_dir) = home_dir() {
        let app_cfg = home_dir.join(".certpick").join("certpick.cfg");
        if let Ok(f) = File::open(app_cfg) {
            match serde_json::from_reader(&f) {
                Ok(saved_options) => return saved_options,
                Err(e) => {
                    error!("Failed to parse saved certpick configuration: {:?}", e);
                }
            };
        }
    }
    SelectOptions::default()
}

/// Returns the [SelectOptions] read from the `--config` file (or the saved configuration in the home
/// directory) with any options given on the command line applied on top.
pub(crate) fn read_options(args: &CertPickArgs) -> Result<SelectOptions> {
    let mut options = match &args.config {
        Some(config) => {
            let f = File::open(config).map_err(|e| {
                error!("Failed to open {config}: {e}");
                e
            })?;
            serde_json::from_reader(&f)?
        }
        None => read_saved_options_or_default(),
    };

    if let Some(store) = &args.store {
        options.reference_store = store.clone();
    }
    if args.title.is_some() {
        options.title = args.title.clone();
    }
    if args.display_string.is_some() {
        options.display_string = args.display_string.clone();
    }
    if args.fail_when_nothing_decodes {
        options.fail_when_nothing_decodes = true;
    }
    if args.skip_picker_when_empty {
        options.skip_picker_when_empty = true;
    }
    Ok(options)
}

/// Returns the certificate strings named by the `--json` file and the positional arguments, in that
/// order
pub(crate) fn read_candidates(args: &CertPickArgs) -> Result<Vec<String>> {
    let mut candidates: Vec<String> = vec![];
    if let Some(json) = &args.json {
        let f = File::open(json).map_err(|e| {
            error!("Failed to open {json}: {e}");
            e
        })?;
        let from_json: Vec<String> = serde_json::from_reader(&f)?;
        candidates.extend(from_json);
    }
    for cert_file in &args.cert_files {
        match fs::read_to_string(cert_file) {
            Ok(text) => candidates.push(text),
            Err(e) => {
                error!("Failed to read {cert_file}: {e}");
                return Err(e.into());
            }
        }
    }
    Ok(candidates)
}
