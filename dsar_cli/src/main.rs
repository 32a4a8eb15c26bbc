use clap::{Arg, ArgAction, ArgMatches, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::mpsc;

use libdsar::config::{Config, Metric};
use libdsar::process::{combine_all, create_subsets, plot_all, process_subset};
use libdsar::worker_status::{BarColor, WorkerStatus};

const LOG_FILE: &str = "dsar.log";

fn make_template_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config)?;
    let mut file = File::create(path)?;
    file.write_all(yaml_str.as_bytes())?;
    Ok(())
}

fn metric_arg() -> Arg {
    Arg::new("metric")
        .short('m')
        .long("metric")
        .help("Metric to use: dsar or rsam")
        .default_value("dsar")
}

fn bar_style(color: BarColor) -> ProgressStyle {
    let template = match color {
        BarColor::CYAN => "{prefix} [{bar:40.cyan/blue}] {pos:>3}% {msg}",
        BarColor::MAGENTA => "{prefix} [{bar:40.magenta/blue}] {pos:>3}% {msg}",
    };
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Run the workers over the configured date range, then combine the daily files
fn run_metric(config: Config, metric: Metric, pb_manager: &MultiProgress) {
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    let subsets = create_subsets(&config);
    let mut bars: Vec<Option<ProgressBar>> = vec![None; subsets.len()];
    let mut workers = vec![];
    for (idx, subset) in subsets.into_iter().enumerate() {
        // Dont make empty workers
        if subset.is_empty() {
            continue;
        }
        let pb = pb_manager.add(ProgressBar::new(100));
        pb.set_style(bar_style(BarColor::for_metric(metric)));
        pb.set_prefix(format!("Worker {idx}"));
        bars[idx] = Some(pb);

        let conf = config.clone();
        let tx = tx.clone();
        workers.push(std::thread::spawn(move || {
            process_subset(conf, metric, tx, idx, subset)
        }));
    }
    // Only the workers hold senders now, so the loop ends when they all finish
    drop(tx);

    for status in rx.iter() {
        if let Some(Some(pb)) = bars.get(status.worker_id) {
            pb.set_position((status.progress * 100.0) as u64);
            pb.set_message(status.date.to_string());
        }
    }

    for worker in workers {
        match worker.join() {
            Ok(Ok(_)) => log::info!("Worker complete"),
            Ok(Err(e)) => log::error!("Processor error: {e}"),
            Err(_) => log::error!("An error occured joining one of the workers!"),
        }
    }
    for pb in bars.into_iter().flatten() {
        pb.finish();
    }

    match combine_all(&config, metric) {
        Ok(stations) => log::info!("Combined {metric} for {} stations.", stations.len()),
        Err(e) => log::error!("Combining failed with error: {e}"),
    }
}

fn parse_metric(sub_matches: &ArgMatches) -> Option<Metric> {
    let name = sub_matches.get_one::<String>("metric")?;
    match Metric::from_str(name) {
        Ok(metric) => Some(metric),
        Err(e) => {
            log::error!("{e}");
            None
        }
    }
}

fn main() {
    // Create a cli
    let matches = Command::new("dsar_cli")
        .about("Compute RSAM and DSAR from an SDS archive of miniSEED files")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(
            Command::new("dsar").about("Compute DSAR for every station and date, then combine"),
        )
        .subcommand(
            Command::new("rsam").about("Compute RSAM for every station and date, then combine"),
        )
        .subcommand(
            Command::new("combine")
                .about("Combine the daily files of every station")
                .arg(metric_arg()),
        )
        .subcommand(
            Command::new("plot")
                .about("Plot the combined files")
                .arg(metric_arg()),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .global(true)
                .help("Path to the configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log debug messages"),
        )
        .get_matches();

    let (command, sub_matches) = match matches.subcommand() {
        Some(sub) => sub,
        None => return,
    };

    // Initialize feedback
    let level = if sub_matches.get_flag("verbose") {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    let mut loggers: Vec<Box<dyn simplelog::SharedLogger>> = vec![simplelog::TermLogger::new(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )];
    match File::create(LOG_FILE) {
        Ok(file) => loggers.push(simplelog::WriteLogger::new(
            level,
            simplelog::Config::default(),
            file,
        )),
        Err(e) => eprintln!("Could not create log file {LOG_FILE}: {e}"),
    }
    let logger = simplelog::CombinedLogger::new(loggers);

    let pb_manager = MultiProgress::new();

    LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .expect("Could not create logging/progress!");
    log::set_max_level(level);

    // Parse the cli
    let config_path = match sub_matches.get_one::<String>("path") {
        Some(path) => PathBuf::from(path),
        None => {
            log::error!("A configuration path is required (-p/--path)");
            return;
        }
    };

    if command == "new" {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        match make_template_config(&config_path) {
            Ok(_) => log::info!("Done."),
            Err(e) => log::error!("Failed to write template config: {e}"),
        }
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    if let Err(e) = config.validate() {
        log::error!("{e}");
        return;
    }
    log::info!("Config successfully loaded.");
    log::info!("SDS Path: {}", config.sds_path.to_string_lossy());
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    log::info!(
        "Stations: {}",
        config
            .stations
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    log::info!(
        "Start Date: {} End Date: {}",
        config.start_date,
        config.end_date
    );
    log::info!("Resample: {}", config.resample);

    match command {
        "dsar" => run_metric(config, Metric::Dsar, &pb_manager),
        "rsam" => run_metric(config, Metric::Rsam, &pb_manager),
        "combine" => {
            if let Some(metric) = parse_metric(sub_matches) {
                match combine_all(&config, metric) {
                    Ok(stations) => {
                        log::info!("Combined {metric} for {} stations.", stations.len())
                    }
                    Err(e) => log::error!("Combining failed with error: {e}"),
                }
            }
        }
        "plot" => {
            if let Some(metric) = parse_metric(sub_matches) {
                match plot_all(&config, metric, &config.stations) {
                    Ok(figures) => log::info!("Saved {} figures.", figures.len()),
                    Err(e) => log::error!("Plotting failed with error: {e}"),
                }
            }
        }
        _ => (),
    }

    log::info!("Done.");
}
