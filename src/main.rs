use std::path::{Path, PathBuf};
use std::process::exit;

use clap::{ArgAction, CommandFactory, Parser};
use strum::{EnumMessage, IntoEnumIterator};

use certinspect::config::{Config, DEFAULT_CONFIG_FILE};
use certinspect::fields::EXTENSION_PREFIX;
use certinspect::logging::{init_logger, level_from_verbosity};
use certinspect::{CertInspector, ConfigError, Field};

/// Exit code when the host cannot be reached or the handshake fails.
const EXIT_CONNECTION: i32 = 2;
const EXIT_USAGE: i32 = 1;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Host to inspect (a URL such as https://host:8443/ also works)
    #[arg(value_name = "HOSTNAME")]
    host: Option<String>,

    /// Port to connect to [default: 443]
    #[arg(short, long)]
    port: Option<u16>,

    /// Send the host name as SNI (default)
    #[arg(short = 's', long, overrides_with = "no_sni")]
    sni: bool,

    /// Do not send SNI
    #[arg(long = "no-sni", overrides_with = "sni")]
    no_sni: bool,

    /// Comma separated fields to display [default: header,cn,san]
    #[arg(short = 'o', long = "output", value_name = "FIELDS")]
    output: Option<String>,

    /// Print out all info on a certificate
    #[arg(short, long)]
    all: bool,

    /// Just print out the certificate expiry date
    #[arg(short, long)]
    expiry: bool,

    /// Network timeout in seconds, 0 to disable [default: 30]
    #[arg(short, long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Configuration file [default: ./certinspect.toml if present]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print an example configuration file and exit
    #[arg(long)]
    generate_config: bool,

    /// List the available fields and exit
    #[arg(long)]
    list_fields: bool,

    /// More log output on stderr (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn sni(&self) -> Option<bool> {
        if self.no_sni {
            Some(false)
        } else if self.sni {
            Some(true)
        } else {
            None
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logger(level_from_verbosity(cli.verbose)) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if cli.generate_config {
        println!("{}", Config::example_toml());
        exit(0);
    }

    if cli.list_fields {
        print_fields();
        exit(0);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            exit(EXIT_USAGE);
        }
    };

    let inspect_config = match config.resolve() {
        Ok(config) => config,
        Err(ConfigError::Validation(msg)) if cli.host.is_none() => {
            eprintln!("{}", msg);
            eprintln!("{}", Cli::command().render_usage());
            exit(EXIT_USAGE);
        }
        Err(e) => {
            eprintln!("{}", e);
            exit(EXIT_USAGE);
        }
    };

    let inspector = CertInspector::new(inspect_config);
    let stdout = std::io::stdout();
    if let Err(e) = inspector.run(&mut stdout.lock()) {
        eprintln!("Failed to inspect {}: {}", inspector.config().host, e);
        exit(if e.is_connection_error() {
            EXIT_CONNECTION
        } else {
            EXIT_USAGE
        });
    }
}

/// Defaults, then the config file, then the command line.
fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = Config::defaults();

    let file = match &cli.config {
        Some(path) => Some(Config::from_file(path)?),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Some(Config::from_file(DEFAULT_CONFIG_FILE)?)
        }
        None => None,
    };
    if let Some(file) = file {
        config = config.merge_with(file);
    }

    Ok(config.merge_with(Config::from_cli_args(
        cli.host.clone(),
        cli.port,
        cli.sni(),
        cli.output.clone(),
        cli.all,
        cli.expiry,
        cli.timeout,
    )))
}

fn print_fields() {
    for field in Field::iter() {
        println!("{:<18} {}", field.to_string(), field.get_message().unwrap_or(""));
    }
    println!(
        "{:<18} {}",
        format!("{}<name|oid>", EXTENSION_PREFIX),
        "A single leaf extension, e.g. ext:keyUsage"
    );
}
