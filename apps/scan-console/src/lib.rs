//! # Titan Scan Console
//!
//! Bench harness for the scan pipeline. Typed lines stand in for camera
//! frames so the whole session lifecycle (start, decode, cooldown, auto
//! resume, camera switch, zoom) can be exercised without hardware.
//!
//! ## Module Organization
//! ```text
//! scan_console_lib/
//! ├── lib.rs          ◄─── You are here (startup & input loop)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── catalog.rs  ◄─── JSON product catalog
//! │   └── cart.rs     ◄─── Cart the scans land in
//! ├── commands.rs     ◄─── Input line parsing
//! ├── emitter.rs      ◄─── Render commands printed to stdout
//! ├── engine.rs       ◄─── Stdin-fed decoding engine
//! └── error.rs        ◄─── Console error type
//! ```
//!
//! ## Usage
//! ```text
//! scan-console [--config scanner.toml] [--catalog products.json]
//!
//! RUST_LOG=titan_scan=trace scan-console
//! ```

pub mod commands;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use titan_scan::{Bootstrap, PipelineResult, ScannerConfig, SessionController};
use titan_scan_core::{InMemoryCatalog, VideoConstraints};

use commands::{ConsoleCommand, HELP};
use emitter::ConsoleEmitter;
use engine::{ConsolePermission, StdinEngine};
use error::{ConsoleError, ConsoleResult};
use state::{demo_catalog, load_catalog, CartState, ConsoleProduct};

/// Preview size the console pretends to render at.
const PREVIEW_SIZE: (f64, f64) = (640.0, 480.0);

// =============================================================================
// Options
// =============================================================================

/// Command-line options.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConsoleOptions {
    pub config: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
}

impl ConsoleOptions {
    /// Parses `--config <path>` and `--catalog <path>`.
    ///
    /// `TITAN_SCAN_CATALOG` supplies the catalog when the flag is absent.
    pub fn parse(args: impl IntoIterator<Item = String>) -> ConsoleResult<Self> {
        let mut options = ConsoleOptions::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args
                        .next()
                        .ok_or_else(|| ConsoleError::UnknownArgument(arg.clone()))?;
                    options.config = Some(path.into());
                }
                "--catalog" => {
                    let path = args
                        .next()
                        .ok_or_else(|| ConsoleError::UnknownArgument(arg.clone()))?;
                    options.catalog = Some(path.into());
                }
                _ => return Err(ConsoleError::UnknownArgument(arg)),
            }
        }

        if options.catalog.is_none() {
            options.catalog = std::env::var("TITAN_SCAN_CATALOG").ok().map(PathBuf::from);
        }
        Ok(options)
    }
}

// =============================================================================
// Console
// =============================================================================

/// Everything the input loop needs.
pub struct Console {
    controller: Arc<SessionController<InMemoryCatalog<ConsoleProduct>>>,
    bootstrap: Arc<Bootstrap>,
    engine: Arc<StdinEngine>,
    cart: CartState,
}

impl Console {
    /// Wires the stdin engine, catalog and cart into a session controller.
    pub fn new(config: ScannerConfig, catalog: InMemoryCatalog<ConsoleProduct>) -> Self {
        let engine = Arc::new(StdinEngine::new());
        let user_agent =
            std::env::var("TITAN_SCAN_USER_AGENT").unwrap_or_else(|_| "titan-scan-console".into());
        let bootstrap = Arc::new(Bootstrap::new(
            engine.clone(),
            Arc::new(ConsolePermission),
            user_agent,
            config.bootstrap.clone(),
            config.camera.facing,
        ));
        let cart = CartState::new();
        let controller = Arc::new(SessionController::new(
            config,
            bootstrap.clone(),
            catalog,
            Arc::new(cart.clone()),
            Arc::new(ConsoleEmitter),
        ));

        Console {
            controller,
            bootstrap,
            engine,
            cart,
        }
    }

    pub fn controller(&self) -> &Arc<SessionController<InMemoryCatalog<ConsoleProduct>>> {
        &self.controller
    }

    pub fn cart(&self) -> &CartState {
        &self.cart
    }

    /// Runs one input line. Returns false when the console should exit.
    pub async fn handle(&self, command: ConsoleCommand) -> bool {
        if let Err(e) = self.dispatch(&command).await {
            // Taxonomy errors were already shown through the emitter.
            warn!(?command, error = %e, "Command failed");
        }
        command != ConsoleCommand::Quit
    }

    async fn dispatch(&self, command: &ConsoleCommand) -> PipelineResult<()> {
        let controller = &self.controller;
        match command {
            ConsoleCommand::Start => {
                controller.start().await?;
            }
            ConsoleCommand::Stop | ConsoleCommand::Quit => {
                controller.stop().await?;
            }
            ConsoleCommand::Retry => {
                controller.retry().await?;
            }
            ConsoleCommand::Switch => {
                controller.switch_camera().await?;
            }
            ConsoleCommand::Pause => {
                controller.pause().await?;
            }
            ConsoleCommand::Resume => {
                controller.resume().await?;
            }
            ConsoleCommand::ZoomIn => {
                controller.zoom_in().await;
            }
            ConsoleCommand::ZoomOut => {
                controller.zoom_out().await;
            }
            ConsoleCommand::Pan { dx, dy } => {
                if controller.begin_pan().await? {
                    controller.pan_by(*dx, *dy).await;
                    println!("[preview] {}", controller.preview_transform().await);
                    controller.end_pan().await?;
                } else {
                    println!("Zoom in before panning");
                }
            }
            ConsoleCommand::Torch => {
                let constraints = VideoConstraints {
                    torch: Some(true),
                    ..VideoConstraints::default()
                };
                controller.apply_video_constraints(&constraints).await?;
            }
            ConsoleCommand::Status => {
                let snapshot = controller.snapshot().await;
                println!("{}", emitter::render_snapshot(&snapshot));
                let report = self.bootstrap.report().await;
                println!(
                    "[bootstrap] engine ready: {}, permission: {:?}, platform: {:?}",
                    report.engine_ready, report.permission_granted, report.platform
                );
            }
            ConsoleCommand::Cart => self.print_cart(),
            ConsoleCommand::Clear => {
                self.cart.clear();
                println!("[cart] cleared");
            }
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::FrameError(message) => {
                if !self.engine.feed_frame_error(message) {
                    println!("No live stream");
                }
            }
            ConsoleCommand::Decoded(text) => {
                if !self.engine.feed_decoded(text) {
                    println!("Frame dropped (not scanning)");
                }
            }
            ConsoleCommand::Empty => {}
            ConsoleCommand::Unknown(line) => println!("Unknown command: {} (try :help)", line),
        }
        Ok(())
    }

    fn print_cart(&self) {
        let lines = self.cart.lines();
        if lines.is_empty() {
            println!("[cart] empty");
            return;
        }
        for line in &lines {
            println!(
                "[cart] {:>3} x {:<28} {:>10.2}",
                line.quantity,
                line.name,
                line.line_total_cents() as f64 / 100.0
            );
        }
        println!("[cart] total {:>36.2}", self.cart.total_cents() as f64 / 100.0);
    }
}

// =============================================================================
// Entry Point
// =============================================================================

/// Runs the console until `:quit` or end of input.
///
/// ## Startup Sequence
/// ```text
/// 1. Initialize logging (RUST_LOG overrides the default filter)
/// 2. Load scanner.toml (defaults if missing or invalid)
/// 3. Load the product catalog (demo catalog if none given)
/// 4. Warm up the engine and permission in the background
/// 5. Spawn the frame pump, then read stdin line by line
/// ```
pub async fn run() -> ConsoleResult<()> {
    init_tracing();

    info!("Starting Titan scan console");

    let options = ConsoleOptions::parse(std::env::args().skip(1))?;
    let config = ScannerConfig::load_or_default(options.config.clone());
    let catalog = match &options.catalog {
        Some(path) => load_catalog(path)?,
        None => {
            info!("No catalog given, using the demo catalog");
            demo_catalog()
        }
    };

    let console = Console::new(config, catalog);
    console.bootstrap.warm_up();
    console.controller.set_viewport(PREVIEW_SIZE.0, PREVIEW_SIZE.1).await;
    let pump = tokio::spawn(console.controller.clone().run());

    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !console.handle(ConsoleCommand::parse(&line)).await {
            break;
        }
    }

    console.controller.stop().await?;
    pump.abort();
    info!("Scan console exited");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=titan_scan=trace` - Show trace for the pipeline only
/// - Default: INFO, DEBUG for the scan crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,titan_scan=debug,titan_scan_core=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .with_writer(std::io::stderr)
        .init();
}
