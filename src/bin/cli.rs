use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use qrsnap::platform::CameraSystem;
use qrsnap::{
    App, CaptureController, DetectionReporter, DetectionRequest, DeviceOrientation, JsonSink,
    LogSink, QrSnapConfig, ReportSink, StillImageDiscovery, TerminalAlert, UiEvent,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Parser)]
#[command(name = "qrsnap", version, about = "Snap a photo and report the barcodes in it")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "qrsnap.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List video capture devices
    Devices {
        #[arg(long)]
        json: bool,
    },
    /// Run detection on an image file
    Detect {
        image: PathBuf,
        #[arg(long)]
        json: bool,
        #[arg(long, default_value = "landscape-left")]
        orientation: DeviceOrientation,
    },
    /// Live capture: Enter snaps a photo, `rotate <orientation>` turns the device, `q` quits
    Scan {
        #[arg(long)]
        device: Option<String>,
        #[arg(long, default_value = "landscape-left")]
        orientation: DeviceOrientation,
        #[arg(long)]
        json: bool,
        /// Save every captured photo into this directory
        #[arg(long)]
        save_dir: Option<PathBuf>,
    },
    /// Show crate version and host platform
    Info {
        #[arg(long)]
        json: bool,
    },
    /// Show or write the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    qrsnap::init_logging();
    let cli = Cli::parse();

    let config = QrSnapConfig::load_layered(&cli.config)?;
    if let Err(e) = config.validate() {
        bail!("Invalid configuration in {:?}: {}", cli.config, e);
    }

    match cli.command {
        Command::Devices { json } => cmd_devices(json),
        Command::Detect {
            image,
            json,
            orientation,
        } => cmd_detect(&config, image, json, orientation),
        Command::Scan {
            device,
            orientation,
            json,
            save_dir,
        } => cmd_scan(config, device, orientation, json, save_dir).await,
        Command::Info { json } => cmd_info(json),
        Command::Config { action } => cmd_config(&config, &cli.config, action),
    }
}

fn cmd_devices(json: bool) -> anyhow::Result<()> {
    let devices = CameraSystem::list_cameras()?;
    if json {
        println!("{}", serde_json::to_string(&devices)?);
    } else if devices.is_empty() {
        println!("No video capture devices found");
    } else {
        for d in devices {
            println!("{}: {}", d.id, d.name);
        }
    }
    Ok(())
}

fn cmd_info(json: bool) -> anyhow::Result<()> {
    let info = qrsnap::get_info();
    if json {
        println!("{}", serde_json::to_string(&info)?);
    } else {
        println!("{} {} ({})", info.name, info.version, info.platform.as_str());
        println!("{}", info.description);
    }
    Ok(())
}

fn build_reporter(config: &QrSnapConfig, json: bool, save_dir: Option<PathBuf>) -> DetectionReporter {
    let request = DetectionRequest::new(
        Arc::new(qrsnap::RqrrDetector::new()),
        config.detection.options(),
    );
    let sink: Box<dyn ReportSink> = if json {
        Box::new(JsonSink)
    } else {
        Box::new(LogSink)
    };

    let reporter = DetectionReporter::with_sink(request, sink);
    let save_dir = save_dir.or_else(|| {
        config
            .storage
            .save_photos
            .then(|| PathBuf::from(&config.storage.output_directory))
    });
    match save_dir {
        Some(dir) => reporter.save_photos_to(dir),
        None => reporter,
    }
}

fn cmd_detect(
    config: &QrSnapConfig,
    image: PathBuf,
    json: bool,
    orientation: DeviceOrientation,
) -> anyhow::Result<()> {
    let discovery = StillImageDiscovery::from_path(&image)
        .with_context(|| format!("Could not load image {:?}", image))?;

    let mut controller = CaptureController::new(Box::new(discovery), config);
    controller.configure(orientation)?;
    controller.start()?;

    let reporter = Arc::new(build_reporter(config, json, None));
    let capture = controller.snap_photo(reporter)?;
    if capture.join().is_err() {
        log::error!("Photo capture thread panicked");
    }

    controller.stop()?;
    Ok(())
}

async fn cmd_scan(
    mut config: QrSnapConfig,
    device: Option<String>,
    orientation: DeviceOrientation,
    json: bool,
    save_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    if device.is_some() {
        config.camera.device_id = device;
    }

    let discovery = CameraSystem::new(config.camera.device_id.clone(), config.camera.format());
    let reporter = Arc::new(build_reporter(&config, json, save_dir));
    let app = App::new(
        &config,
        Box::new(discovery),
        reporter,
        Box::new(TerminalAlert),
    )
    .with_orientation(orientation);

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    let quit = tx.clone();
    ctrlc::set_handler(move || {
        let _ = quit.send(UiEvent::Quit);
    })
    .context("Could not install Ctrl-C handler")?;

    std::thread::Builder::new()
        .name("qrsnap-stdin".to_string())
        .spawn(move || read_input(tx))
        .context("Could not spawn input thread")?;

    app.run(rx).await?;
    Ok(())
}

/// Turn stdin lines into UI events
fn read_input(tx: UnboundedSender<UiEvent>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();

        let event = if line.is_empty() {
            UiEvent::Tap
        } else if line == "q" || line == "quit" {
            UiEvent::Quit
        } else if let Some(arg) = line.strip_prefix("rotate ") {
            match arg.parse::<DeviceOrientation>() {
                Ok(o) => UiEvent::OrientationChanged(o),
                Err(e) => {
                    eprintln!("{}", e);
                    continue;
                }
            }
        } else {
            eprintln!("Press Enter to snap, `rotate <orientation>` to turn, `q` to quit");
            continue;
        };

        if tx.send(event).is_err() {
            break;
        }
    }
    let _ = tx.send(UiEvent::Quit);
}

fn cmd_config(config: &QrSnapConfig, path: &Path, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(config)?);
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{:?} already exists (use --force to overwrite)", path);
            }
            QrSnapConfig::default().save_to_file(path)?;
            println!("Wrote {:?}", path);
        }
    }
    Ok(())
}
