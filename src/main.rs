//! Command-line entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use parking_lot::{Mutex, RwLock};
use tracing_subscriber::EnvFilter;

use clickscript::{
    load_scripts, CapturePolicy, ClickScriptError, EnigoPointer, KeyEvent, KeyListener,
    KeybindRecorder, PointerDriver, RunController, RunState, Script,
};
use clickscript::recorder::DEFAULT_CAPTURE_TIMEOUT;

#[derive(Parser)]
#[command(name = "clickscript", version, about = "Hotkey-triggered mouse macro runner")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a script file and dispatch hotkeys until interrupted
    Run {
        /// Path to the script file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Capture a key combination and print its canonical form
    Record {
        /// Finish on Escape instead of the first non-modifier release
        #[arg(long)]
        explicit_stop: bool,
    },
    /// Validate a script file and list its contents
    Check {
        /// Path to the script file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run { config } => run(config).await,
        Command::Record { explicit_stop } => record(explicit_stop).await,
        Command::Check { config } => check(config),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "clickscript=debug"
    } else {
        "clickscript=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn describe(script: &Script) -> String {
    let keybind = if script.keybind.is_empty() {
        "unbound".dimmed().to_string()
    } else {
        script.keybind.to_string().cyan().to_string()
    };
    let suffix = if script.return_mouse {
        ", returns mouse"
    } else {
        ""
    };
    format!(
        "{} [{}] ({} targets{})",
        script.name.as_str().bold(),
        keybind,
        script.targets.len(),
        suffix
    )
}

async fn run(config: PathBuf) -> Result<()> {
    let scripts = load_scripts(&config)?;
    scripts.validate()?;

    println!("📜 {} script(s) loaded:", scripts.len());
    for (_, script) in scripts.iter() {
        println!("   {}", describe(script));
    }

    let (listener, events) = KeyListener::spawn()?;
    let pointer: Arc<Mutex<dyn PointerDriver>> = Arc::new(Mutex::new(EnigoPointer::new()?));
    let controller = RunController::new(Arc::new(RwLock::new(scripts)), pointer, events);
    controller.start();

    println!(
        "🟢 {} (press Ctrl+C to quit)",
        "hotkey dispatch running".green()
    );

    let mut state = controller.subscribe_state();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("🔴 {}", "stopping".yellow());
        }
        _ = state.wait_for(|s| *s == RunState::Stopped) => {
            eprintln!("{}", "run mode stopped unexpectedly".red());
        }
    }

    controller.stop();
    drop(listener);
    Ok(())
}

async fn record(explicit_stop: bool) -> Result<()> {
    let policy = if explicit_stop {
        CapturePolicy::ExplicitStop
    } else {
        CapturePolicy::FirstRelease
    };
    match policy {
        CapturePolicy::ExplicitStop => {
            println!("⌨️  press keys, then Escape to finish...")
        }
        CapturePolicy::FirstRelease => {
            println!("⌨️  hold modifiers, tap the trigger key, release it...")
        }
    }

    let (listener, mut events) = KeyListener::spawn()?;
    let mut recorder = KeybindRecorder::start(policy, DEFAULT_CAPTURE_TIMEOUT);
    let deadline = tokio::time::Instant::from_std(recorder.deadline());

    let outcome = loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break recorder.stop(),
            event = events.recv() => match event {
                None => break Err(ClickScriptError::subscription(
                    "key event stream closed during capture",
                )),
                Some(KeyEvent::Down(raw)) => {
                    if let Some(result) = recorder.on_key_down(&raw) {
                        break result;
                    }
                }
                Some(KeyEvent::Up(raw)) => {
                    if let Some(result) = recorder.on_key_up(&raw) {
                        break result;
                    }
                }
            }
        }
    };
    drop(listener);

    let combo = outcome?;
    println!(
        "✅ {} {}",
        "captured:".green(),
        combo.to_string().as_str().bold()
    );
    println!("   keybind entry: {}", serde_json::to_string(&combo)?);
    Ok(())
}

fn check(config: PathBuf) -> Result<()> {
    let scripts = load_scripts(&config)?;
    scripts.validate()?;

    println!("✅ {} {} script(s)", "valid:".green(), scripts.len());
    for (_, script) in scripts.iter() {
        println!("   {}", describe(script));
    }
    Ok(())
}
