use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use crossterm::event::KeyEventKind;
use serde::Serialize;
use tracing::{info, warn};

use vitals::app::App;
use vitals::config::{self, Config, load_config, load_config_from_path};
use vitals::event::{Event, EventHandler};
use vitals::logging::{self, LogTarget};
use vitals::system::bus::CollectorHealth;
use vitals::system::snapshot::{
    CpuSnapshot, Domain, HostSnapshot, MemorySnapshot, NetworkSnapshot, ProcessSnapshot,
};
use vitals::system::supervisor::{Supervisor, SupervisorOptions};
use vitals::ui;

#[derive(Parser)]
#[command(
    name = "vitals",
    about = "Terminal dashboard for CPU, memory, network and process metrics"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Redraw interval in milliseconds
    #[arg(long)]
    refresh_rate: Option<u64>,

    /// Rate smoothing factor in (0, 1]; 1 disables smoothing
    #[arg(long)]
    smoothing_alpha: Option<f64>,

    /// Initial process sort: cpu, memory, pid, name
    #[arg(long)]
    sort: Option<String>,

    /// Write logs here instead of the default state directory
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Sample for a short window, print every snapshot as JSON and exit.
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Sampling window for --once.
    #[arg(long, default_value_t = 3000)]
    once_duration_ms: u64,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let mut config = load_config_for_cli(&cli);

    let target = if cli.once {
        Some(LogTarget::Stderr)
    } else {
        cli.log_file
            .clone()
            .or_else(|| config.general.log_file.clone())
            .or_else(logging::default_log_path)
            .map(LogTarget::File)
    };
    if let Some(target) = target {
        logging::init(target, &config.general.log_level)?;
    }
    config.sanitize();

    let shutdown_grace = Duration::from_millis(config.sampling.shutdown_timeout_ms);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = if cli.once {
        runtime.block_on(run_once(&config, Duration::from_millis(cli.once_duration_ms)))
    } else {
        runtime.block_on(run_dashboard(&config))
    };

    // A poll stuck in the OS must not keep the process alive.
    runtime.shutdown_timeout(shutdown_grace);
    result
}

async fn run_dashboard(config: &Config) -> Result<()> {
    let supervisor = Supervisor::start_native(SupervisorOptions::from(config))?;

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, config, &supervisor).await;
    ratatui::restore();

    let report = supervisor.shutdown().await;
    if !report.is_clean() {
        warn!(abandoned = ?report.abandoned, "some collectors were abandoned at exit");
    }
    result
}

async fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    config: &Config,
    supervisor: &Supervisor,
) -> Result<()> {
    let tick_rate = Duration::from_millis(config.general.refresh_rate_ms);
    let mut app = App::new(config, supervisor.bus(), supervisor.process_control());
    let mut events = EventHandler::new(tick_rate, supervisor.bus());

    let size = terminal.size()?;
    app.set_viewport(size.width, size.height);
    terminal.draw(|frame| ui::draw(frame, &app))?;

    while app.running {
        let Some(event) = events.next().await else {
            break;
        };
        let should_draw = match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let action = app.map_key(key);
                app.dispatch(action);
                true
            }
            Event::Key(_) => false,
            Event::Data => app.refresh_data(),
            Event::Tick => app.housekeep(),
            Event::Resize(width, height) => {
                app.set_viewport(width, height);
                true
            }
        };
        if should_draw && app.running {
            terminal.draw(|frame| ui::draw(frame, &app))?;
        }
    }

    info!("quit requested");
    supervisor.request_shutdown();
    Ok(())
}

#[derive(Serialize)]
struct DomainReport {
    domain: Domain,
    generation: u64,
    health: CollectorHealth,
}

#[derive(Serialize)]
struct OnceDump<'a> {
    host: Option<&'a HostSnapshot>,
    cpu: Option<&'a CpuSnapshot>,
    memory: Option<&'a MemorySnapshot>,
    network: Option<&'a NetworkSnapshot>,
    processes: Option<&'a ProcessSnapshot>,
    collectors: Vec<DomainReport>,
    abandoned: Vec<Domain>,
}

async fn run_once(config: &Config, window: Duration) -> Result<()> {
    let supervisor = Supervisor::start_native(SupervisorOptions::from(config))?;
    tokio::time::sleep(window).await;

    let bus = supervisor.bus();
    let report = supervisor.shutdown().await;

    let host = bus.host();
    let cpu = bus.cpu();
    let memory = bus.memory();
    let network = bus.network();
    let processes = bus.processes();
    let dump = OnceDump {
        host: host.as_ref().map(|(s, _)| s.as_ref()),
        cpu: cpu.as_ref().map(|(s, _)| s.as_ref()),
        memory: memory.as_ref().map(|(s, _)| s.as_ref()),
        network: network.as_ref().map(|(s, _)| s.as_ref()),
        processes: processes.as_ref().map(|(s, _)| s.as_ref()),
        collectors: Domain::ALL
            .into_iter()
            .map(|domain| DomainReport {
                domain,
                generation: bus.generation(domain),
                health: bus.health(domain),
            })
            .collect(),
        abandoned: report.abandoned,
    };

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &dump)?;
    writeln!(stdout)?;
    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> config::Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(rate) = cli.refresh_rate {
        config.general.refresh_rate_ms = rate;
    }
    if let Some(alpha) = cli.smoothing_alpha {
        config.sampling.smoothing_alpha = alpha;
    }
    if let Some(ref sort) = cli.sort {
        config.process.default_sort = sort.clone();
    }
    if let Some(ref path) = cli.log_file {
        config.general.log_file = Some(path.clone());
    }

    config
}
