use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::layout::Rect;
use ratatui::DefaultTerminal;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trendmap::api::BackendClient;
use trendmap::app::{App, AppEvent, DateField, Fetch, Focus};
use trendmap::config::{AppConfig, CliConfig, FileConfig};
use trendmap::{data, ui};

#[derive(Parser, Debug)]
#[command(version, about)]
struct CliArgs {
    /// Path to a TOML configuration file.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the map backend.
    #[clap(long)]
    pub backend_url: Option<String>,

    /// Directory with Natural Earth coastline GeoJSON files.
    #[clap(long)]
    pub data_dir: Option<PathBuf>,

    /// File that receives the log output.
    #[clap(long)]
    pub log_file: Option<PathBuf>,

    /// Render the map as soon as the selection allows it.
    #[clap(long)]
    pub auto_update: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            backend_url: self.backend_url.clone(),
            data_dir: self.data_dir.clone(),
            log_file: self.log_file.clone(),
            auto_update: self.auto_update,
        }
    }
}

/// The terminal is owned by the UI, so logs go to a file
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {:?}", path))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install log subscriber")
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    init_logging(&config.log_file)?;
    info!("Using backend at {}", config.backend_url);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let client = BackendClient::new(&config.backend_url, config.request_timeout)?;

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &config, &runtime, &client);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    if let Err(e) = &result {
        tracing::error!("Exiting with error: {:#}", e);
    }
    result
}

/// Run each fetch on the runtime; outcomes come back through `tx`
fn dispatch(runtime: &Runtime, client: &BackendClient, tx: &UnboundedSender<AppEvent>, fetches: Vec<Fetch>) {
    for fetch in fetches {
        let client = client.clone();
        let tx = tx.clone();
        runtime.spawn(async move {
            let event = fetch.run(&client).await;
            // The receiver only goes away on shutdown
            let _ = tx.send(event);
        });
    }
}

fn screen_rect(terminal: &DefaultTerminal) -> Result<Rect> {
    let size = terminal.size()?;
    Ok(Rect::new(0, 0, size.width, size.height))
}

fn run(terminal: &mut DefaultTerminal, config: &AppConfig, runtime: &Runtime, client: &BackendClient) -> Result<()> {
    let mut map_area = ui::layout(screen_rect(terminal)?).map;
    let mut app = App::new(config, map_area.width as usize, map_area.height as usize);
    app.set_map_area(map_area.x, map_area.y, map_area.width, map_area.height);

    if config.data_dir.exists() {
        if let Err(e) = data::load_base_layer(&mut app.map_renderer, &config.data_dir) {
            warn!("Failed to load base layer from {:?}: {:#}", config.data_dir, e);
        }
    }
    // Fall back to the built-in outline if no data loaded
    if !app.map_renderer.has_data() {
        data::generate_simple_world(&mut app.map_renderer);
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    dispatch(runtime, client, &tx, app.startup());

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            let fetches = match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(&mut app, key),
                Event::Mouse(mouse) => {
                    handle_mouse(&mut app, mouse, map_area);
                    Vec::new()
                }
                Event::Resize(width, height) => {
                    map_area = ui::layout(Rect::new(0, 0, width, height)).map;
                    app.set_map_area(map_area.x, map_area.y, map_area.width, map_area.height);
                    Vec::new()
                }
                _ => Vec::new(),
            };
            dispatch(runtime, client, &tx, fetches);
        }

        while let Ok(event) = rx.try_recv() {
            app.handle_event(event);
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Vec<Fetch> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return Vec::new();
    }

    // The error modal swallows everything until dismissed
    if app.error.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.dismiss_error();
        }
        return Vec::new();
    }

    let date_field = match app.focus {
        Focus::StartDate => Some(DateField::Start),
        Focus::EndDate => Some(DateField::End),
        _ => None,
    };

    match key.code {
        KeyCode::Tab | KeyCode::BackTab => {
            // Leaving a date field commits it
            let fetches = date_field.map(|field| app.commit_date(field)).unwrap_or_default();
            if key.code == KeyCode::Tab {
                app.focus_next();
            } else {
                app.focus_prev();
            }
            return fetches;
        }
        KeyCode::Esc => {
            app.escape();
            return Vec::new();
        }
        _ => {}
    }

    match app.focus {
        Focus::ResourceType => match key.code {
            KeyCode::Left | KeyCode::Char('h') => app.cycle_resource_type(false),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Enter | KeyCode::Char(' ') => {
                app.cycle_resource_type(true)
            }
            _ => handle_shortcut(app, key.code),
        },
        Focus::Mode => match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Char('h' | 'l' | ' ') | KeyCode::Enter => app.toggle_mode(),
            _ => handle_shortcut(app, key.code),
        },
        Focus::Resource => match key.code {
            KeyCode::Char(ch) => app.resource_push_char(ch),
            KeyCode::Backspace => app.resource_backspace(),
            KeyCode::Down => {
                app.highlight_next();
                Vec::new()
            }
            KeyCode::Up => {
                app.highlight_prev();
                Vec::new()
            }
            KeyCode::Enter => app.accept_suggestion(),
            _ => Vec::new(),
        },
        Focus::StartDate | Focus::EndDate => {
            let field = date_field.unwrap_or(DateField::Start);
            match key.code {
                KeyCode::Char(ch) => {
                    app.date_push_char(field, ch);
                    Vec::new()
                }
                KeyCode::Backspace => {
                    app.date_backspace(field);
                    Vec::new()
                }
                KeyCode::Enter => app.commit_date(field),
                _ => Vec::new(),
            }
        }
        Focus::Update => match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => app.request_update(),
            _ => handle_shortcut(app, key.code),
        },
        Focus::Map => {
            match key.code {
                // Pan with hjkl or arrow keys
                KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
                KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

                // Zoom
                KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),
                KeyCode::Enter | KeyCode::Char('i') => app.inspect_center(),
                _ => return handle_shortcut(app, key.code),
            }
            Vec::new()
        }
    }
}

/// Keys shared by the non-text controls
fn handle_shortcut(app: &mut App, code: KeyCode) -> Vec<Fetch> {
    match code {
        KeyCode::Char('q') => {
            app.quit();
            Vec::new()
        }
        KeyCode::Char('u') => app.request_update(),
        _ => Vec::new(),
    }
}

/// Handle mouse events for panning, zooming and inspecting
fn handle_mouse(app: &mut App, mouse: MouseEvent, map_area: Rect) {
    let inside = mouse.column >= map_area.x
        && mouse.column < map_area.x + map_area.width
        && mouse.row >= map_area.y
        && mouse.row < map_area.y + map_area.height;

    match mouse.kind {
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp if inside => app.zoom_at(mouse.column, mouse.row, true),
        MouseEventKind::ScrollDown if inside => app.zoom_at(mouse.column, mouse.row, false),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft if inside => app.pan(-15, 0),
        MouseEventKind::ScrollRight if inside => app.pan(15, 0),
        // Click to inspect, drag to pan
        MouseEventKind::Down(MouseButton::Left) if inside => {
            app.focus = Focus::Map;
            app.inspect(mouse.column, mouse.row);
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) if app.last_mouse.is_some() => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        _ => {}
    }
}
