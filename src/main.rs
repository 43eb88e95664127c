use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use star_pointer_rs::platform::{MockArSession, MockCamera, MockLocationService};
use star_pointer_rs::sensors::{self, SensorEvent};
use star_pointer_rs::{
    run_event_loop, AuthorizationState, BearingOverlayController, CameraAuthorization,
    HeadingSource, LoopOptions, PointerConfig, SharedReadings,
};

#[derive(Parser, Debug)]
#[command(name = "star_pointer")]
#[command(about = "Star pointer - simulated compass driving an AR bearing indicator", long_about = None)]
struct Args {
    /// Duration in seconds (0 = continuous)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// JSON configuration file
    #[arg(long)]
    config: Option<String>,

    /// Override the target azimuth (degrees clockwise from true north)
    #[arg(long)]
    target_azimuth: Option<f64>,

    /// Write the status snapshot as JSON to this file every second
    #[arg(long)]
    status_file: Option<String>,

    /// Simulated heading sweep per compass sample, in degrees
    #[arg(long, default_value = "0.5")]
    sweep: f64,

    /// Simulated latitude
    #[arg(long, default_value = "51.4769", allow_hyphen_values = true)]
    lat: f64,

    /// Simulated longitude
    #[arg(long, default_value = "-0.0005", allow_hyphen_values = true)]
    lon: f64,

    /// Simulate hardware without world tracking
    #[arg(long)]
    no_ar: bool,

    /// Simulate camera permission denied
    #[arg(long)]
    camera_denied: bool,

    /// Simulate the AR session failing to start with this message
    #[arg(long, value_name = "MESSAGE")]
    session_fails: Option<String>,

    /// Answer the location permission prompt with "denied"
    #[arg(long)]
    location_denied: bool,

    /// Simulate location services switched off globally
    #[arg(long)]
    location_disabled: bool,

    /// Revoke location authorization after this many seconds
    #[arg(long, value_name = "SECONDS")]
    revoke_after: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PointerConfig::load(path)
            .with_context(|| format!("loading config from {}", path))?,
        None => PointerConfig::default(),
    };
    if let Some(azimuth) = args.target_azimuth {
        config.target_azimuth_deg = azimuth;
    }
    config.validate()?;

    log::info!("Star Pointer starting");
    log::info!("  Duration: {} seconds (0=continuous)", args.duration);
    log::info!("  Target azimuth: {:.1}°", config.target_azimuth_deg);
    log::info!("  Tick interval: {} ms", config.tick_interval_ms);

    let (tx, rx) = mpsc::channel::<SensorEvent>(256);

    let answer = if args.location_denied {
        AuthorizationState::Denied
    } else {
        AuthorizationState::AuthorizedWhenInUse
    };
    let location = MockLocationService::new(AuthorizationState::NotDetermined)
        .grant_on_request(answer)
        .with_services_enabled(!args.location_disabled)
        .with_event_sender(tx.clone());

    let mut session = MockArSession::new();
    if args.no_ar {
        session = session.unsupported();
    }
    if let Some(message) = &args.session_fails {
        session = session.failing_with(message);
    }
    let camera = MockCamera::new(if args.camera_denied {
        CameraAuthorization::Denied
    } else {
        CameraAuthorization::Authorized
    });

    let readings = SharedReadings::new();
    let mut source = HeadingSource::new(
        location.clone(),
        readings,
        config.desired_accuracy,
        config.heading_filter_deg,
    );
    let mut overlay = BearingOverlayController::new(
        session,
        camera,
        config.target_azimuth_deg,
        config.anchor_offset(),
        config.indicator.clone(),
    );

    // Hold the handle so the feed stays alive
    let _sim_handle = tokio::spawn(sensors::simulated_heading_loop(
        tx.clone(),
        (args.lat, args.lon),
        args.sweep,
    ));
    drop(tx);

    if let Some(secs) = args.revoke_after {
        let location = location.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(secs)).await;
            log::info!("Revoking location authorization");
            location.set_authorization(AuthorizationState::Denied);
        });
    }

    let options = LoopOptions {
        tick_interval: Duration::from_millis(config.tick_interval_ms),
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        status_file: args.status_file.clone(),
        ..LoopOptions::default()
    };

    let summary = run_event_loop(rx, &mut source, &mut overlay, options).await?;

    if let Some(message) = overlay.error_message() {
        log::warn!("Overlay error: {}", message);
    }
    log::info!(
        "Done: {} events, {} orientation updates, last bearing {}",
        summary.events,
        summary.orientation_updates,
        summary
            .last_bearing_deg
            .map(|b| format!("{:.1}°", b))
            .unwrap_or_else(|| "n/a".to_string())
    );

    Ok(())
}
