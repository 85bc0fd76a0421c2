use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use log::{error, info, warn};
use pik_intercom_bridge::api::{IntercomApi, InventoryApi};
use pik_intercom_bridge::config::{self, Config};
use pik_intercom_bridge::entity::{CameraImage, DeviceMetadata, IntercomCamera};
use pik_intercom_bridge::error::{BridgeError, Result};
use pik_intercom_bridge::host::{BlockingCamera, IntegrationHost};
use pik_intercom_bridge::media::{FfmpegFrameGrabber, FrameGrabber};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "intercom-camera",
    version,
    about = "Pik intercom cameras as home-automation camera entities"
)]
struct Cli {
    /// JSON device inventory
    #[arg(long, env = "INVENTORY_PATH")]
    inventory: Option<PathBuf>,

    /// Consecutive snapshot failures before a device refresh (minimum 5)
    #[arg(long, env = "RETRIEVAL_ERROR_THRESHOLD")]
    retrieval_error_threshold: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every camera entity with its metadata
    List,
    /// Fetch one image through the blocking host shim
    Snapshot {
        #[arg(long)]
        device: u64,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Poll every camera like a host would until Ctrl+C
    Poll {
        #[arg(long)]
        interval_secs: Option<u64>,
        /// Save each retrieved image here
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() -> ExitCode {
    // .env must be applied before the runtime starts its worker threads
    config::load_dotenv();
    init_logger();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(path) = cli.inventory {
        config.inventory.path = path;
    }
    if let Some(threshold) = cli.retrieval_error_threshold {
        config.camera.retrieval_error_threshold = threshold;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config, cli.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config, command: Command) -> Result<()> {
    info!("Starting Pik intercom camera bridge");
    info!("  Config entry: {}", config.entry_id);
    info!("  Inventory: {}", config.inventory.path.display());
    info!(
        "  Retrieval error threshold: {}",
        config.retrieval_error_threshold()
    );

    let api: Arc<dyn IntercomApi> = Arc::new(InventoryApi::load(&config.inventory).await?);
    let frame_grabber: Arc<dyn FrameGrabber> = Arc::new(FfmpegFrameGrabber::new(&config.ffmpeg));

    let entry = config.config_entry();
    let host = IntegrationHost::new();
    host.setup_entry(&entry, api, frame_grabber);
    let cameras = host.entities(&entry.entry_id);

    let result = match command {
        Command::List => list(&cameras).await,
        Command::Snapshot {
            device,
            width,
            height,
            output,
        } => {
            let camera = host
                .camera(&entry.entry_id, device)
                .ok_or(BridgeError::DeviceNotFound(device))?;
            snapshot(camera, width, height, &output).await
        }
        Command::Poll {
            interval_secs,
            output_dir,
        } => {
            let secs = interval_secs.unwrap_or(config.camera.poll_interval_secs);
            if secs == 0 {
                return Err(BridgeError::Config("poll interval must be positive".into()));
            }
            poll(&cameras, Duration::from_secs(secs), output_dir.as_deref()).await
        }
    };

    host.unload_entry(&entry.entry_id);
    result
}

async fn list(cameras: &[Arc<IntercomCamera>]) -> Result<()> {
    for camera in cameras {
        let summary = serde_json::json!({
            "entity_id": camera.entity_id(),
            "unique_id": camera.unique_id(),
            "name": camera.name()?,
            "icon": camera.icon(),
            "supported_features": camera.supported_features(),
            "stream_source": camera.stream_source().await,
            "device_info": camera.device_info()?,
            "attributes": camera.extra_state_attributes()?,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

async fn snapshot(
    camera: Arc<IntercomCamera>,
    width: Option<u32>,
    height: Option<u32>,
    output: &Path,
) -> Result<()> {
    let shim = BlockingCamera::new(camera.clone(), Handle::current());
    let image = tokio::task::spawn_blocking(move || shim.camera_image(width, height))
        .await
        .map_err(|e| BridgeError::TaskFailed(e.to_string()))??;

    match image {
        Some(image) => {
            tokio::fs::write(output, &image).await?;
            info!(
                "[{}] Saved {} bytes to {}",
                camera.entity_id(),
                image.len(),
                output.display()
            );
        }
        None => warn!("[{}] No image available", camera.entity_id()),
    }
    Ok(())
}

async fn poll(
    cameras: &[Arc<IntercomCamera>],
    interval: Duration,
    output_dir: Option<&Path>,
) -> Result<()> {
    if let Some(dir) = output_dir {
        tokio::fs::create_dir_all(dir).await?;
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        signal_token.cancel();
    });

    info!(
        "Polling {} camera(s) every {}s, press Ctrl+C to exit",
        cameras.len(),
        interval.as_secs()
    );

    let mut ticker = tokio::time::interval(interval);
    // A slow grab must not make the skipped ticks fire back to back
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let results = join_all(cameras.iter().map(|c| c.camera_image(None, None))).await;
        for (camera, result) in cameras.iter().zip(results) {
            match result {
                Ok(Some(image)) => {
                    info!("[{}] Image: {} bytes", camera.entity_id(), image.len());
                    if let Some(dir) = output_dir {
                        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
                        let path = dir.join(format!("{}-{}.jpg", camera.device_id(), stamp));
                        if let Err(e) = tokio::fs::write(&path, &image).await {
                            warn!("Failed to save {}: {}", path.display(), e);
                        }
                    }
                }
                Ok(None) => info!("[{}] No image", camera.entity_id()),
                Err(e) => error!("[{}] Update failed: {}", camera.entity_id(), e),
            }
        }
    }

    info!("Polling stopped");
    Ok(())
}
