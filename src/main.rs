use clap::{Arg, ArgMatches, Command};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use nscan_report::core::config::Config;
use nscan_report::core::errors::{ReportEngineError, ReportResult};
use nscan_report::report::{RenderedReport, ReportEngine, ReportFormat, ReportMetadata};
use nscan_report::scan::{ScanResult, ScanType};

const DEFAULT_CONFIG: &str = "nscan.yaml";

fn main() {
    let matches = build_cli().get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_CONFIG);
    let loaded = Config::load_from_file(config_path);

    let level = if matches.get_flag("verbose") {
        Level::DEBUG
    } else {
        loaded
            .as_ref()
            .ok()
            .and_then(|config| config.app.log_level.parse().ok())
            .unwrap_or(Level::INFO)
    };

    // Set up the logging subscriber
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Logging could not be initialized: {}", e);
    }

    let mut config = match loaded {
        Ok(config) => {
            info!("Configuration file successfully loaded: {}", config_path);
            config
        }
        Err(e) => {
            warn!("Config file could not be loaded ({}), using default settings", e);
            Config::default_config()
        }
    };
    config.apply_env_overrides();

    let result = match matches.subcommand() {
        Some(("generate", sub_matches)) => handle_generate_command(sub_matches, &config),
        Some(("summary", sub_matches)) => handle_summary_command(sub_matches, &config),
        Some(("formats", _)) => {
            print_formats(&config);
            Ok(())
        }
        Some(("config", sub_matches)) => handle_config_command(sub_matches, &config, config_path),
        _ => {
            info!("Run 'nscan-report --help' for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        error!(stage = %e.stage(), "{}", e);
        std::process::exit(if e.is_input_error() { 2 } else { 1 });
    }
}

fn build_cli() -> Command {
    let input_arg = Arg::new("input")
        .short('i')
        .long("input")
        .value_name("FILE")
        .help("Scan result file (host list or scan API envelope, JSON)")
        .required(true)
        .value_parser(clap::value_parser!(String));
    let scan_type_arg = Arg::new("scan-type")
        .short('t')
        .long("scan-type")
        .value_name("TYPE")
        .help("Scan type (quick, full, stealth, vuln, service, os, udp, script, custom)")
        .value_parser(clap::value_parser!(String))
        .default_value("quick");

    Command::new("nscan-report")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Security report generator for network scan results")
        .long_about("nscan-report turns scan results into PDF, CSV and HTML security reports.")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Specifies a custom config file")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::SetTrue)
                .help("Show detailed output"),
        )
        .subcommand(
            Command::new("generate")
                .about("Generate a report from scan results")
                .arg(input_arg.clone())
                .arg(scan_type_arg.clone())
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_name("FORMAT")
                        .help("Report format (pdf, csv, html, all); defaults to the configured format")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("PATH")
                        .help("Output file or directory")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    Arg::new("scan-id")
                        .long("scan-id")
                        .value_name("ID")
                        .help("Scan identifier; a UUID is generated when absent")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    Arg::new("timestamp")
                        .long("timestamp")
                        .value_name("TIME")
                        .help("Scan timestamp; defaults to now (RFC 3339)")
                        .value_parser(clap::value_parser!(String)),
                ),
        )
        .subcommand(
            Command::new("summary")
                .about("Print scan statistics to the console")
                .arg(input_arg)
                .arg(scan_type_arg),
        )
        .subcommand(Command::new("formats").about("List supported report formats"))
        .subcommand(
            Command::new("config")
                .about("Configuration management")
                .arg(
                    Arg::new("show")
                        .long("show")
                        .action(clap::ArgAction::SetTrue)
                        .help("Show current configuration"),
                )
                .arg(
                    Arg::new("init")
                        .long("init")
                        .action(clap::ArgAction::SetTrue)
                        .help("Create default config file"),
                ),
        )
}

fn handle_generate_command(matches: &ArgMatches, config: &Config) -> ReportResult<()> {
    let scan = load_scan(matches)?;
    let scan_type = parse_scan_type(matches)?;

    let scan_id = matches
        .get_one::<String>("scan-id")
        .cloned()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let timestamp = matches
        .get_one::<String>("timestamp")
        .cloned()
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());
    let metadata = ReportMetadata::new(scan_type, timestamp).with_scan_id(scan_id);

    let engine = ReportEngine::new(config.report_context());
    let formats = match matches.get_one::<String>("format").map(|s| s.as_str()) {
        Some("all") => ReportFormat::all().to_vec(),
        Some(format) => vec![format.parse()?],
        None => vec![config.report.default_format],
    };

    let reports = if formats.len() == 1 {
        vec![engine.render(formats[0], scan, metadata.clone())?]
    } else {
        engine.render_all(&formats, scan, metadata.clone())?
    };

    let output = matches.get_one::<String>("output").map(PathBuf::from);
    for report in &reports {
        let path = output_path(output.as_deref(), config, report, &metadata, reports.len() > 1);
        write_report(&path, report)?;
        info!("{} report saved: {}", report.format.file_extension().to_uppercase(), path.display());
        println!("{}", path.display());
    }

    Ok(())
}

fn handle_summary_command(matches: &ArgMatches, config: &Config) -> ReportResult<()> {
    let scan = load_scan(matches)?;
    let scan_type = parse_scan_type(matches)?;
    let metadata = ReportMetadata::new(scan_type, chrono::Utc::now().to_rfc3339());

    let engine = ReportEngine::new(config.report_context());
    let data = engine.prepare(scan, metadata, false)?;
    let stats = &data.statistics;

    println!("NSCAN REPORT SUMMARY");
    println!("====================");
    println!("Scan type: {}", data.metadata.scan_type_label());
    println!("Hosts:     {}", stats.total_hosts);
    println!();
    println!("PORT STATES");
    println!("-----------");
    println!("Open:     {}", stats.open_ports);
    println!("Closed:   {}", stats.closed_ports);
    println!("Filtered: {}", stats.filtered_ports);
    println!();
    println!("RISK BREAKDOWN");
    println!("--------------");
    println!("High:   {}", stats.risk.high);
    println!("Medium: {}", stats.risk.medium);
    println!("Low:    {}", stats.risk.low);

    let services = stats.services.top_n(config.charts.top_services);
    if !services.is_empty() {
        println!();
        println!("TOP SERVICES");
        println!("------------");
        for (i, (service, count)) in services.iter().enumerate() {
            println!("{}. {} ({})", i + 1, service, count);
        }
    }

    if scan_type == ScanType::Os {
        println!();
        println!("OS DETECTION");
        println!("------------");
        println!("{}", data.os_statistics.narrative());
    } else {
        println!();
        println!("{}", stats.narrative());
    }

    Ok(())
}

fn handle_config_command(matches: &ArgMatches, config: &Config, config_path: &str) -> ReportResult<()> {
    if matches.get_flag("init") {
        if Path::new(config_path).exists() {
            warn!("Config file already exists, not overwriting: {}", config_path);
            return Ok(());
        }
        Config::default_config().save_to_file(config_path)?;
        info!("Default config file created: {}", config_path);
        return Ok(());
    }

    if matches.get_flag("show") {
        let yaml = serde_yaml::to_string(config)?;
        println!("{}", yaml);
    }
    Ok(())
}

fn print_formats(config: &Config) {
    println!("SUPPORTED REPORT FORMATS");
    println!("========================");

    for format in ReportFormat::all() {
        let marker = if format == config.report.default_format { "*" } else { " " };
        println!(
            "{} {:<5} {:<20} {}",
            marker,
            format.file_extension(),
            format.tag(),
            format.mime_type()
        );
    }

    println!("\nOutput directory: {}", config.report.output_dir);
}

fn load_scan(matches: &ArgMatches) -> ReportResult<ScanResult> {
    let input = matches
        .get_one::<String>("input")
        .ok_or_else(|| ReportEngineError::malformed_input("no input file given"))?;
    info!("Loading scan results: {}", input);

    let content = std::fs::read_to_string(input)
        .map_err(|e| ReportEngineError::io(format!("Input file could not be read: {} - {}", input, e)))?;
    nscan_report::scan::ScanInput::from(content).into_scan_result()
}

fn parse_scan_type(matches: &ArgMatches) -> ReportResult<ScanType> {
    matches
        .get_one::<String>("scan-type")
        .map(|s| s.parse())
        .unwrap_or(Ok(ScanType::Quick))
}

/// Explicit file paths win; directories and the default get the suggested name
fn output_path(
    output: Option<&Path>,
    config: &Config,
    report: &RenderedReport,
    metadata: &ReportMetadata,
    multiple: bool,
) -> PathBuf {
    let filename = report.suggested_filename(metadata);
    match output {
        Some(path) if path.is_dir() || multiple => path.join(filename),
        Some(path) => path.to_path_buf(),
        None => Path::new(&config.report.output_dir).join(filename),
    }
}

fn write_report(path: &Path, report: &RenderedReport) -> ReportResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            ReportEngineError::io(format!("Output directory could not be created: {} - {}", parent.display(), e))
        })?;
    }
    std::fs::write(path, &report.content)?;
    Ok(())
}
