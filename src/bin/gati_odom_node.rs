//! gati-odom-node daemon
//!
//! Receives wheel-encoder and reference-pose samples over UDP, runs the EKF
//! estimation pipeline, and publishes fused odometry for downstream consumers.
//!
//! # Usage
//!
//! ```bash
//! # With default config
//! cargo run --bin gati-odom-node
//!
//! # With custom config file
//! cargo run --bin gati-odom-node -- --config gati-odom.toml
//!
//! # With command line overrides
//! cargo run --bin gati-odom-node -- --listen 0.0.0.0:6020 --publish 127.0.0.1:6021
//! ```

use gati_odom::{
    DisplacementConfig, EkfConfig, EstimatorPipeline, MeasurementNoise, OdometryMessage,
    OdometryPublisher, PipelineConfig, Pose2D, ProcessNoise, PublisherConfig, ReceiverConfig,
    ResetConfig, SensorEvent, SensorReceiver, WheelSide,
};
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct Config {
    #[serde(default)]
    source: SourceConfig,
    #[serde(default)]
    output: OutputConfig,
    #[serde(default)]
    robot: RobotConfig,
    #[serde(default)]
    filter: FilterConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SourceConfig {
    listen_addr: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:6020".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OutputConfig {
    publish_addr: String,
    frame_id: String,
    child_frame_id: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            publish_addr: "127.0.0.1:6021".to_string(),
            frame_id: "world".to_string(),
            child_frame_id: "base_footprint".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RobotConfig {
    wheel_radius: f32,
    wheel_base: f32,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            wheel_radius: 0.035,
            wheel_base: 0.235,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FilterConfig {
    forward_noise_var: f32,
    lateral_noise_var: f32,
    heading_noise_var: f32,
    heading_measurement_var: f32,
    reset_period_s: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let process = ProcessNoise::default();
        Self {
            forward_noise_var: process.forward_var,
            lateral_noise_var: process.lateral_var,
            heading_noise_var: process.heading_var,
            heading_measurement_var: MeasurementNoise::default().heading_var,
            reset_period_s: 100_000.0,
        }
    }
}

/// Command line arguments
struct Args {
    config_path: Option<String>,
    listen_addr: Option<String>,
    publish_addr: Option<String>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args {
        config_path: None,
        listen_addr: None,
        publish_addr: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    result.config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--listen" | "-l" => {
                if i + 1 < args.len() {
                    result.listen_addr = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--publish" | "-p" => {
                if i + 1 < args.len() {
                    result.publish_addr = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: gati-odom-node [--config FILE] [--listen ADDR] [--publish ADDR]");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn load_config(args: &Args) -> Config {
    let mut config = match &args.config_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(cfg) => cfg,
                Err(e) => {
                    eprintln!("Failed to parse config {}: {}", path, e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Failed to read config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => {
            // Default location, silently ignored when absent
            if let Ok(contents) = fs::read_to_string("gati-odom.toml")
                && let Ok(cfg) = toml::from_str(&contents)
            {
                cfg
            } else {
                Config::default()
            }
        }
    };

    if let Some(addr) = &args.listen_addr {
        config.source.listen_addr = addr.clone();
    }
    if let Some(addr) = &args.publish_addr {
        config.output.publish_addr = addr.clone();
    }

    config
}

fn pipeline_config(config: &Config) -> PipelineConfig {
    PipelineConfig {
        displacement: DisplacementConfig {
            wheel_radius: config.robot.wheel_radius,
            wheel_base: config.robot.wheel_base,
        },
        ekf: EkfConfig {
            process_noise: ProcessNoise {
                forward_var: config.filter.forward_noise_var,
                lateral_var: config.filter.lateral_noise_var,
                heading_var: config.filter.heading_noise_var,
            },
            measurement_noise: MeasurementNoise {
                heading_var: config.filter.heading_measurement_var,
            },
        },
        reset: ResetConfig {
            period_us: (config.filter.reset_period_s * 1e6) as u64,
        },
    }
}

/// Wall-clock time in microseconds since the epoch.
fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    // Parse arguments and load config
    let args = parse_args();
    let config = load_config(&args);

    log::info!("gati-odom-node starting...");
    log::info!("  Listen: {}", config.source.listen_addr);
    log::info!("  Publish: {}", config.output.publish_addr);
    log::info!(
        "  Robot: wheel_radius={}m wheel_base={}m",
        config.robot.wheel_radius,
        config.robot.wheel_base
    );
    log::info!("  Reset period: {}s", config.filter.reset_period_s);

    // Setup signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .expect("Error setting Ctrl-C handler");

    if let Err(e) = run(&config, running) {
        log::error!("Fatal: {}", e);
        std::process::exit(1);
    }

    log::info!("gati-odom-node shutdown complete");
}

fn run(config: &Config, running: Arc<AtomicBool>) -> Result<(), Box<dyn std::error::Error>> {
    let receiver_config = ReceiverConfig {
        bind_addr: config.source.listen_addr.clone(),
    };
    let (receiver, events) = SensorReceiver::spawn(receiver_config, running.clone())?;

    let publisher_config = PublisherConfig {
        target_addr: config.output.publish_addr.clone(),
        frame_id: config.output.frame_id.clone(),
        child_frame_id: config.output.child_frame_id.clone(),
    };
    let mut publisher = OdometryPublisher::new(publisher_config)?;

    let mut pipeline = EstimatorPipeline::new(pipeline_config(config));

    while running.load(Ordering::Relaxed) {
        // Bounded wait so reset polling and shutdown stay responsive even
        // when no samples arrive.
        let event = match events.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => Some(event),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => None,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        };

        let now = now_us();
        if pipeline.poll_reset(now) && let Some(estimate) = pipeline.estimate() {
            let (frame_id, child_frame_id) = publisher.frames();
            let msg = OdometryMessage::from_estimate(&estimate, frame_id, child_frame_id);
            publisher.publish(&msg)?;
        }

        let Some(event) = event else { continue };

        match event {
            SensorEvent::Encoder {
                wheel,
                position,
                velocity,
                timestamp_us,
            } => {
                let reading = gati_odom::EncoderReading {
                    position,
                    velocity,
                    timestamp_us,
                };
                if let Some(estimate) = pipeline.handle_encoder(wheel, reading, now) {
                    log_estimate(wheel, &estimate);
                    let (frame_id, child_frame_id) = publisher.frames();
                    let msg = OdometryMessage::from_estimate(&estimate, frame_id, child_frame_id);
                    publisher.publish(&msg)?;
                }
            }
            SensorEvent::ReferencePose {
                x,
                y,
                yaw,
                timestamp_us,
            } => {
                pipeline.handle_reference(Pose2D::new(x, y, yaw), timestamp_us);
            }
        }
    }

    receiver.join().ok();
    Ok(())
}

fn log_estimate(wheel: WheelSide, estimate: &gati_odom::PoseEstimate) {
    log::trace!(
        "cycle ({:?} completed pair): pose=({:.3}, {:.3}, {:.3}) v={:.3} w={:.3}",
        wheel,
        estimate.pose.x,
        estimate.pose.y,
        estimate.pose.theta,
        estimate.twist.linear,
        estimate.twist.angular
    );
}
