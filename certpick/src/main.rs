#![doc = include_str!("../README.md")]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

#[macro_use]
extern crate cfg_if;

use clap::{CommandFactory, Parser};
use log::debug;

#[cfg(target_os = "windows")]
use crate::no_bold::NoBold;
#[cfg(not(target_os = "windows"))]
use colored::Colorize;

use certpicklib::{decode_certificate_text, Result, SelectOptions};

mod args;
use args::CertPickArgs;

#[cfg(target_os = "windows")]
mod no_bold;
mod utils;

use utils::{configure_logging, read_candidates, read_options};

/// Confirms provided arguments include at least one source of candidate certificates
fn sanity_check(args: &CertPickArgs) -> bool {
    if args.cert_files.is_empty() && args.json.is_none() {
        println!(
            "{}: at least one CERT_FILE or a --json argument must be provided\n",
            "ERROR".bold()
        );
        let _ = CertPickArgs::command().print_help();
        false
    } else {
        true
    }
}

/// Prints the decode outcome of each candidate without touching any certificate store
fn dry_run(candidates: &[String]) {
    for (index, candidate) in candidates.iter().enumerate() {
        match decode_certificate_text(candidate) {
            Ok(pc) => {
                println!("{}: {}", "Index".bold(), index);
                println!("\t* Subject: {}", pc.subject());
                println!("\t* Thumbprint: {}", pc.thumbprint());
            }
            Err(e) => {
                println!("{}: {}", "Index".bold(), index);
                println!("\t* Not offered: {:?}", e);
            }
        }
    }
}

cfg_if! {
    if #[cfg(target_os = "windows")] {
        fn select(candidates: &[String], options: &SelectOptions) -> Result<i32> {
            use winapi::um::wincon::GetConsoleWindow;

            // parent the dialog to the console so it is presented in front of it
            let console = unsafe { GetConsoleWindow() };
            let mut options = options.clone();
            if !console.is_null() {
                options.owner_window = Some(console as isize);
            }
            certpicklib::select_client_cert_with_options(candidates, &options)
        }
    } else {
        fn select(_candidates: &[String], _options: &SelectOptions) -> Result<i32> {
            log::error!("The certificate selection dialog is only available on Windows");
            Err(certpicklib::Error::PickerUnavailable)
        }
    }
}

/// Point of entry for `certpick` application.
///
/// See [CertPickArgs] for usage details.
fn main() {
    let args = CertPickArgs::parse();
    configure_logging(&args);

    if !sanity_check(&args) {
        std::process::exit(1);
    }

    let candidates = match read_candidates(&args) {
        Ok(candidates) => candidates,
        Err(e) => {
            println!("{}: failed to read certificates: {:?}", "ERROR".bold(), e);
            std::process::exit(1);
        }
    };
    debug!("Read {} candidate certificates", candidates.len());

    if args.dry_run {
        dry_run(&candidates);
        return;
    }

    let options = match read_options(&args) {
        Ok(options) => options,
        Err(e) => {
            println!("{}: failed to read options: {:?}", "ERROR".bold(), e);
            std::process::exit(1);
        }
    };

    match select(&candidates, &options) {
        Ok(index) => println!("{index}"),
        Err(e) => {
            println!("{}: {:?}", "ERROR".bold(), e);
            std::process::exit(1);
        }
    }
}
