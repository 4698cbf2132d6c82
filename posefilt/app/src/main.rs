mod jitter;
mod strategies;

use anyhow::{Context, Result};
use common::{
    AppConfig, FilterManager, FrameSink, InputMode, OutputMode, PoseFrame, PoseSource,
};
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jitter::JitterMeter;

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn log_stats(manager: &FilterManager, jitter: &JitterMeter) {
    let stats = manager.stats();
    info!(
        "Frames: {} | Filters: {} | Avg: {:.3} ms | Errors: {} | Jitter: {:.3} -> {:.3} ({:.1}% removed)",
        stats.performance.total_filtered,
        stats.filter_count,
        stats.performance.average_processing_time,
        stats.error_count,
        jitter.raw_mean(),
        jitter.filtered_mean(),
        jitter.reduction() * 100.0
    );
}

fn import_config(manager: &mut FilterManager, path: &Path) -> Result<()> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read filter config {:?}", path))?;
    manager.import_config(&json)?;
    Ok(())
}

fn export_config(manager: &FilterManager, path: &Path) -> Result<()> {
    fs::write(path, manager.export_config().to_json())
        .with_context(|| format!("Failed to write filter config {:?}", path))?;
    info!("Exported filter config to {:?}", path);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting...");
    debug!("Debug logging is active");

    let args: Vec<String> = std::env::args().collect();

    let config_path = arg_value(&args, "--config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.json"));
    let mut config = AppConfig::load_or_create(&config_path).unwrap_or_else(|e| {
        error!("Failed to load config: {:#}. Using defaults.", e);
        AppConfig::default()
    });

    if let Some(addr) = arg_value(&args, "--listen") {
        config.input = InputMode::Udp;
        config.listen_address = addr;
    }
    if let Some(addr) = arg_value(&args, "--send") {
        config.output = OutputMode::Udp;
        config.send_address = addr;
    }
    if let Some(path) = arg_value(&args, "--export") {
        config.export_path = Some(PathBuf::from(path));
    }
    info!("Loaded Config: {:?}", config);

    let mut manager = FilterManager::new(config.filter.clone());

    if let Some(path) = arg_value(&args, "--import") {
        if let Err(e) = import_config(&mut manager, Path::new(&path)) {
            error!("{:#}", e);
        }
    }
    if let Some(name) = arg_value(&args, "--preset") {
        if let Err(e) = manager.apply_preset(&name) {
            error!("{}", e);
        }
    }
    if args.iter().any(|arg| arg == "--disable") {
        manager.set_enabled(false);
    }

    let running = Arc::new(AtomicBool::new(true));
    if config.input == InputMode::Udp {
        let r = running.clone();
        ctrlc::set_handler(move || {
            info!("Received Ctrl-C, shutting down...");
            r.store(false, Ordering::SeqCst);
        })
        .context("Error setting Ctrl-C handler")?;
    }

    let mut source = strategies::create_source(&config, running.clone())?;
    let mut sink = strategies::create_sink(&config);
    sink.initialize().context("Failed to initialize output")?;
    info!(
        "Filtering {:?} -> {:?} with {:?}",
        config.input,
        config.output,
        manager.parameters()
    );

    let mut jitter = JitterMeter::default();
    let mut frame_count: u64 = 0;
    let mut send_failures: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                error!("Input failed: {:#}", e);
                break;
            }
        };

        let filtered = PoseFrame {
            timestamp: frame.timestamp,
            poses: manager.filter_multiple_poses(&frame.poses, frame.timestamp),
        };
        jitter.observe(&frame, &filtered);

        #[cfg(feature = "xtralog")]
        log::trace!(
            "Frame {} at {} ms: {} keypoints",
            frame_count,
            frame.timestamp,
            frame.keypoint_count()
        );

        if let Err(e) = sink.send(&filtered) {
            send_failures += 1;
            if send_failures == 1 {
                warn!("Failed to send frame: {:#}", e);
            }
        }

        frame_count += 1;
        if config.stats_interval > 0 && frame_count % config.stats_interval == 0 {
            log_stats(&manager, &jitter);
        }
    }

    if send_failures > 0 {
        warn!("{} frame(s) could not be sent", send_failures);
    }
    log_stats(&manager, &jitter);

    if let Some(path) = &config.export_path {
        export_config(&manager, path)?;
    }

    info!("Processed {} frame(s). Bye.", frame_count);
    Ok(())
}
