//! Album server - serves photo albums from a directory tree.
//!
//! This binary parses the configuration, wires the components together and
//! starts the HTTP server.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use album_server::{
    album::Tier,
    config::{Config, TranscoderKind},
    create_router, AlbumRegistry, AppState, DerivativeResolver, ImageCrateTranscoder,
    ImageTranscoder, LocalFilesystem, MagickTranscoder, RefreshGate, ResizeQueue, RouterConfig,
    SessionStore,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("album-server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Album directory: {}", config.album_dir.display());
    info!(
        "  Derivatives: thumbnail {}px, display {}px, preview {}x{} ({})",
        config.thumbnail_size,
        config.display_size,
        config.preview_width,
        config.preview_height,
        config.preview_selection
    );
    match config.transcoder {
        TranscoderKind::Image => info!("  Transcoder: image crate (quality {})", config.jpeg_quality),
        TranscoderKind::Magick => {
            info!("  Transcoder: ImageMagick ({})", config.magick_binary.display())
        }
    }
    if let Some(ref dir) = config.static_dir {
        info!("  Static assets: {}", dir.display());
    }
    info!("  Session idle timeout: {}h", config.session_idle_hours);

    if config.uses_default_refresh_password() {
        warn!("  Refresh password is the default - anyone can reload albums");
        warn!("        Set --refresh-password or GALLERY_REFRESH_PASSWORD");
    }

    check_album_root(&config);

    // Wire components
    let registry = Arc::new(AlbumRegistry::new(
        LocalFilesystem::new(),
        config.album_dir.clone(),
    ));
    let transcoder: Arc<dyn ImageTranscoder> = match config.transcoder {
        TranscoderKind::Image => Arc::new(ImageCrateTranscoder::with_quality(config.jpeg_quality)),
        TranscoderKind::Magick => Arc::new(MagickTranscoder::new(config.magick_binary.clone())),
    };
    let resolver = Arc::new(
        DerivativeResolver::new(registry.clone(), ResizeQueue::new(transcoder))
            .with_sizes(config.derivative_sizes())
            .with_preview_selection(config.preview_selection),
    );
    let refresh_gate = Arc::new(RefreshGate::with_delay(
        registry.clone(),
        config.refresh_password.clone(),
        config.refresh_delay(),
    ));

    let sessions = Arc::new(SessionStore::with_idle_timeout(config.session_idle_timeout()));

    let state = AppState::new(registry, resolver, refresh_gate).with_sessions(sessions);
    let router = create_router(state, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    open http://{}/", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Warn about tier directories missing from the album root.
///
/// Missing tiers are not fatal; they simply hold no albums.
fn check_album_root(config: &Config) {
    if !config.album_dir.is_dir() {
        warn!(
            "  Album directory {} does not exist yet",
            config.album_dir.display()
        );
        return;
    }

    for tier in Tier::ALL {
        let dir = config.album_dir.join(tier.dir_name());
        if !dir.is_dir() {
            warn!("  No {} directory at {}", tier, dir.display());
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "album_server=debug,tower_http=debug"
    } else {
        "album_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref dir) = config.static_dir {
        router_config = router_config.with_static_dir(dir.clone());
    }

    router_config
}
