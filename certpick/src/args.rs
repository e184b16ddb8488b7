//! Command line arguments for the certpick utility

use clap::Parser;

/// Presents a certificate selection dialog limited to the given certificates and prints the zero-based
/// index of the chosen certificate, or -1 if no certificate was chosen.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CertPickArgs {
    /// Files containing PEM-armored or base64-encoded certificates, offered in the order given
    #[arg(value_name = "CERT_FILE", help_heading = "Inputs")]
    pub cert_files: Vec<String>,

    /// File containing a JSON array of PEM-armored or base64-encoded certificates. These are offered
    /// ahead of any CERT_FILE arguments.
    #[arg(short, long, value_name = "FILE", help_heading = "Inputs")]
    pub json: Option<String>,

    /// Logical name of the current user's certificate store used to resolve candidates (default: MY)
    #[arg(short, long, help_heading = "Selection")]
    pub store: Option<String>,

    /// Title of the certificate selection dialog
    #[arg(long, help_heading = "Selection")]
    pub title: Option<String>,

    /// Text displayed above the list of certificates
    #[arg(long, help_heading = "Selection")]
    pub display_string: Option<String>,

    /// Fail instead of presenting an empty dialog when none of the certificates can be decoded
    #[arg(long, help_heading = "Selection")]
    pub fail_when_nothing_decodes: bool,

    /// Do not present the dialog when there are no certificates to offer
    #[arg(long, help_heading = "Selection")]
    pub skip_picker_when_empty: bool,

    /// JSON file containing selection options. When absent, <home>/.certpick/certpick.cfg is used if
    /// present.
    #[arg(long, value_name = "FILE", help_heading = "Selection")]
    pub config: Option<String>,

    /// Decode the certificates and print a report without presenting the dialog
    #[arg(short, long, help_heading = "Diagnostics")]
    pub dry_run: bool,

    /// Full path and filename of YAML-formatted configuration file for log4rs logging mechanism.
    /// See https://docs.rs/log4rs/latest/log4rs/ for details.
    #[arg(short = 'c', long, help_heading = "Logging", conflicts_with = "log_to_console")]
    pub logging_config: Option<String>,

    /// Log output to the console
    #[arg(short = 'l', long, help_heading = "Logging", conflicts_with = "logging_config")]
    pub log_to_console: bool,
}
