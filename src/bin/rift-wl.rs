use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow, bail};
use clap::{Parser, ValueEnum};
use rift_wl::common::collections::HashMap;
use rift_wl::common::config::{Config, LayoutMode, config_file};
use rift_wl::common::log;
use rift_wl::layout_engine::{
    Direction, DragMode, EventResponse, InputState, LayoutContext, LayoutEngine, LayoutNotification,
    RatioChange, ResizeCorner,
};
use rift_wl::model::{
    FullscreenMode, Monitor, MonitorId, MonitorRegistry, Window, WindowId, WindowRegistry,
    WorkspaceId,
};
use rift_wl::sys::geometry::{Insets, Point, Rect};
use serde::Serialize;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "rift-wl")]
#[command(about = "Drive the rift-wl layout core against a virtual monitor")]
struct Cli {
    /// Config file to load instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Layout to start with, overriding the config.
    #[arg(long, value_enum)]
    layout: Option<LayoutMode>,

    /// Check the config file and exit.
    #[arg(long)]
    validate: bool,

    /// Print window state as JSON.
    #[arg(long)]
    json: bool,

    /// Size of the virtual monitor.
    #[arg(long, default_value_t = 1920.0)]
    width: f64,
    #[arg(long, default_value_t = 1080.0)]
    height: f64,

    /// Script to run, one command per line. Reads stdin when omitted.
    script: Option<PathBuf>,
}

fn parse_command(command: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current_part = String::new();
    let mut in_quotes = false;

    for ch in command.chars() {
        match ch {
            '\'' | '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if !current_part.is_empty() {
                    parts.push(std::mem::take(&mut current_part));
                }
            }
            '#' if !in_quotes && current_part.is_empty() => break,
            _ => current_part.push(ch),
        }
    }

    if !current_part.is_empty() {
        parts.push(current_part);
    }

    parts
}

#[derive(Serialize)]
struct WindowReport<'a> {
    name: &'a str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    floating: bool,
    fullscreen: bool,
    hidden: bool,
    focused: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    group: Vec<&'a str>,
}

/// A virtual seat: one monitor, one workspace and named windows.
struct Session {
    config: Config,
    windows: WindowRegistry,
    monitors: MonitorRegistry,
    input: InputState,
    events: Vec<LayoutNotification>,
    engine: LayoutEngine,
    names: HashMap<String, WindowId>,
    order: Vec<String>,
    ws: WorkspaceId,
    mon: MonitorId,
    clock: Instant,
    json: bool,
}

impl Session {
    fn new(config: Config, mode: LayoutMode, frame: Rect, json: bool) -> Self {
        let mut monitors = MonitorRegistry::default();
        let mon = monitors.add_monitor(Monitor::new("VIRTUAL-1", frame));
        let ws = monitors.add_workspace("1", mon);
        Self {
            config,
            windows: WindowRegistry::default(),
            monitors,
            input: InputState::default(),
            events: Vec::new(),
            engine: LayoutEngine::new(mode),
            names: HashMap::default(),
            order: Vec::new(),
            ws,
            mon,
            clock: Instant::now(),
            json,
        }
    }

    fn ctx(&mut self) -> (&mut LayoutEngine, LayoutContext<'_>) {
        let ctx = LayoutContext::new(
            &self.config.settings,
            &mut self.windows,
            &mut self.monitors,
            &self.input,
            &mut self.events,
        );
        (&mut self.engine, ctx)
    }

    fn window(&self, name: Option<&String>) -> anyhow::Result<WindowId> {
        match name {
            Some(name) => {
                self.names.get(name).copied().ok_or_else(|| anyhow!("no window named '{name}'"))
            }
            None => self.input.focused.ok_or_else(|| anyhow!("no focused window")),
        }
    }

    fn name_of(&self, id: WindowId) -> &str {
        self.names
            .iter()
            .find(|(_, w)| **w == id)
            .map(|(n, _)| n.as_str())
            .unwrap_or("?")
    }

    fn apply(&mut self, response: EventResponse) {
        if let Some(focus) = response.focus_window {
            self.focus(focus);
        }
    }

    fn focus(&mut self, window: WindowId) {
        self.input.focused = Some(window);
        let (engine, ctx) = self.ctx();
        engine.on_window_focused(&ctx, window);
    }

    fn tick(&mut self) -> Instant {
        self.clock += Duration::from_millis(100);
        self.clock
    }

    fn run(&mut self, args: &[String]) -> anyhow::Result<()> {
        let Some((cmd, rest)) = args.split_first() else {
            return Ok(());
        };
        debug!(command = %cmd, ?rest, "running");
        match cmd.as_str() {
            "open" => self.open(rest)?,
            "close" => {
                let w = self.window(rest.first())?;
                let (engine, mut ctx) = self.ctx();
                let response = engine.on_window_removed(&mut ctx, w);
                self.windows.remove(w);
                let name = self.name_of(w).to_string();
                self.names.remove(&name);
                self.order.retain(|n| *n != name);
                if self.input.focused == Some(w) {
                    self.input.focused = None;
                }
                self.apply(response);
            }
            "focus" => {
                let w = self.window(rest.first())?;
                self.focus(w);
            }
            "cursor" => {
                let [x, y] = numbers::<2>(rest)?;
                self.input.cursor = Point::new(x, y);
            }
            "float" => {
                let w = self.window(rest.first())?;
                let (engine, mut ctx) = self.ctx();
                let response = engine.change_window_floating_mode(&mut ctx, w);
                self.apply(response);
            }
            "fullscreen" | "maximize" => {
                let w = self.window(rest.first())?;
                let mode = if cmd == "maximize" {
                    FullscreenMode::Maximized
                } else {
                    FullscreenMode::Fullscreen
                };
                let on = match rest.get(1).map(String::as_str) {
                    Some("on") => true,
                    Some("off") => false,
                    Some(other) => bail!("expected on or off, got '{other}'"),
                    None => !self.windows.get(w).is_some_and(|w| w.fullscreen),
                };
                let (engine, mut ctx) = self.ctx();
                let response = engine.set_fullscreen(&mut ctx, w, on, mode);
                self.apply(response);
            }
            "group" => self.group(rest)?,
            "msg" => {
                let (engine, mut ctx) = self.ctx();
                let response = engine.layout_message(&mut ctx, None, &rest.join(" "))?;
                self.apply(response);
            }
            "move" => {
                let (w, dir) = self.window_and_direction(rest)?;
                let (engine, mut ctx) = self.ctx();
                engine.move_window_in_direction(&mut ctx, w, dir);
            }
            "swap" => {
                let a = self.window(rest.first())?;
                let b = self.window(rest.get(1))?;
                let (engine, mut ctx) = self.ctx();
                engine.switch_windows(&mut ctx, a, b);
            }
            "resize" => {
                let w = self.window(rest.first())?;
                let [dx, dy] = numbers::<2>(rest.get(1..).unwrap_or_default())?;
                let (engine, mut ctx) = self.ctx();
                engine.resize_active_window(&mut ctx, w, Point::new(dx, dy), ResizeCorner::None);
            }
            "ratio" => {
                let w = self.window(rest.first())?;
                let args: Vec<&str> = rest.iter().skip(1).map(String::as_str).collect();
                let change = RatioChange::parse(&args, "ratio")?;
                let (engine, mut ctx) = self.ctx();
                engine.alter_split_ratio(&mut ctx, w, change);
            }
            "drag" => self.drag(rest)?,
            "reserve" => {
                let [top, left, bottom, right] = numbers::<4>(rest)?;
                if let Some(monitor) = self.monitors.monitor_mut(self.mon) {
                    monitor.reserved = Insets::new(top, left, bottom, right);
                }
                let mon = self.mon;
                let (engine, mut ctx) = self.ctx();
                engine.recalculate_monitor(&mut ctx, mon);
            }
            "layout" => {
                let mode = rest
                    .first()
                    .ok_or_else(|| anyhow!("layout needs a mode"))
                    .and_then(|m| LayoutMode::from_str(m, true).map_err(|e| anyhow!(e)))?;
                let (engine, mut ctx) = self.ctx();
                engine.set_layout_mode(&mut ctx, mode);
            }
            "animate" => self.windows.warp_all(),
            "tree" => println!("{}", self.engine.draw_tree(self.ws)),
            "print" => self.print()?,
            other => bail!("unknown command '{other}'"),
        }
        for event in self.events.drain(..) {
            info!(?event, "layout notification");
        }
        Ok(())
    }

    fn open(&mut self, args: &[String]) -> anyhow::Result<()> {
        let mut floating = false;
        let mut name = None;
        let mut direction = None;
        for arg in args {
            match arg.as_str() {
                "float" => floating = true,
                other => match other.strip_prefix("dir=") {
                    Some(d) => direction = Some(d.parse::<Direction>()?),
                    None => name = Some(other.to_string()),
                },
            }
        }
        let name = name.unwrap_or_else(|| format!("w{}", self.order.len() + 1));
        if self.names.contains_key(&name) {
            bail!("window '{name}' already exists");
        }
        let mut window = Window::new(self.ws, self.mon);
        if floating {
            window = window.floating();
        }
        let id = self.windows.add(window);
        self.names.insert(name.clone(), id);
        self.order.push(name);
        let (engine, mut ctx) = self.ctx();
        let response = engine.on_window_created(&mut ctx, id, direction);
        self.apply(response);
        Ok(())
    }

    fn window_and_direction(&self, args: &[String]) -> anyhow::Result<(WindowId, Direction)> {
        match args {
            [dir] => Ok((self.window(None)?, dir.parse()?)),
            [name, dir] => Ok((self.window(Some(name))?, dir.parse()?)),
            _ => bail!("expected [window] <direction>"),
        }
    }

    fn group(&mut self, args: &[String]) -> anyhow::Result<()> {
        let Some((verb, rest)) = args.split_first() else {
            bail!("group needs a verb");
        };
        let response = match verb.as_str() {
            "toggle" => {
                let w = self.window(rest.first())?;
                let (engine, mut ctx) = self.ctx();
                engine.toggle_group(&mut ctx, w)
            }
            "next" | "prev" => {
                let w = self.window(rest.first())?;
                let (engine, mut ctx) = self.ctx();
                engine.change_group_active(&mut ctx, w, verb == "next")
            }
            "show" => {
                let w = self.window(rest.first())?;
                let (engine, mut ctx) = self.ctx();
                engine.set_group_current(&mut ctx, w)
            }
            "into" => {
                let (w, dir) = self.window_and_direction(rest)?;
                let (engine, mut ctx) = self.ctx();
                engine.move_into_group(&mut ctx, w, dir)
            }
            "out" => {
                let w = self.window(rest.first())?;
                let (engine, mut ctx) = self.ctx();
                engine.move_out_of_group(&mut ctx, w)
            }
            "lock" => {
                let w = self.window(rest.first())?;
                let (engine, mut ctx) = self.ctx();
                engine.lock_group(&mut ctx, w, None);
                EventResponse::default()
            }
            "lockall" => {
                let (engine, mut ctx) = self.ctx();
                engine.set_groups_locked(&mut ctx, None);
                EventResponse::default()
            }
            other => bail!("unknown group verb '{other}'"),
        };
        self.apply(response);
        Ok(())
    }

    fn drag(&mut self, args: &[String]) -> anyhow::Result<()> {
        let Some((verb, rest)) = args.split_first() else {
            bail!("drag needs a verb");
        };
        match verb.as_str() {
            "start" => {
                let w = self.window(rest.first())?;
                let mode = match rest.get(1) {
                    Some(m) => m.parse::<DragMode>()?,
                    None => DragMode::Move,
                };
                let (engine, mut ctx) = self.ctx();
                engine.begin_drag(&mut ctx, w, mode)?;
            }
            "to" => {
                let [x, y] = numbers::<2>(rest)?;
                self.input.cursor = Point::new(x, y);
                let now = self.tick();
                let (engine, mut ctx) = self.ctx();
                engine.mouse_move(&mut ctx, now);
            }
            "end" => {
                let (engine, mut ctx) = self.ctx();
                let response = engine.end_drag(&mut ctx);
                self.apply(response);
            }
            "cancel" => {
                let (engine, mut ctx) = self.ctx();
                engine.cancel_drag(&mut ctx);
            }
            other => bail!("unknown drag verb '{other}'"),
        }
        Ok(())
    }

    fn print(&self) -> anyhow::Result<()> {
        let reports: Vec<WindowReport<'_>> = self
            .order
            .iter()
            .filter_map(|name| {
                let id = *self.names.get(name)?;
                let w = self.windows.get(id)?;
                Some(WindowReport {
                    name,
                    x: w.goal.origin.x,
                    y: w.goal.origin.y,
                    width: w.goal.size.width,
                    height: w.goal.size.height,
                    floating: w.floating,
                    fullscreen: w.fullscreen,
                    hidden: w.hidden,
                    focused: self.input.focused == Some(id),
                    group: self.windows.group_members(id).into_iter().map(|m| self.name_of(m)).collect(),
                })
            })
            .collect();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
            return Ok(());
        }
        for r in reports {
            let mut flags = Vec::new();
            if r.focused {
                flags.push("focused");
            }
            if r.floating {
                flags.push("floating");
            }
            if r.fullscreen {
                flags.push("fullscreen");
            }
            if r.hidden {
                flags.push("hidden");
            }
            println!(
                "{:<8} {:>6} {:>6} {:>6} {:>6}  {}",
                r.name,
                r.x,
                r.y,
                r.width,
                r.height,
                flags.join(",")
            );
        }
        Ok(())
    }
}

fn numbers<const N: usize>(args: &[String]) -> anyhow::Result<[f64; N]> {
    let mut out = [0.0; N];
    if args.len() < N {
        bail!("expected {N} numbers, got {}", args.len());
    }
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg.parse().with_context(|| format!("'{arg}' is not a number"))?;
    }
    Ok(out)
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let default_path = config_file();
    let path = path.unwrap_or(&default_path);
    if !path.exists() {
        debug!(?path, "no config file, using defaults");
        return Ok(Config::default());
    }
    let mut config =
        Config::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let issues = config.validate();
    for issue in &issues {
        error!("config: {issue}");
    }
    if !issues.is_empty() {
        let fixed = config.auto_fix_values();
        info!(fixed, "corrected invalid config values");
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let opt: Cli = Parser::parse();

    if std::env::var_os("RUST_BACKTRACE").is_none() {
        // SAFETY: We are single threaded at this point.
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }
    log::init_logging();
    install_panic_hook();

    if opt.validate {
        let path = opt.config.clone().unwrap_or_else(config_file);
        let config = Config::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let issues = config.validate();
        for issue in &issues {
            println!("{issue}");
        }
        if !issues.is_empty() {
            bail!("{} problem(s) in {}", issues.len(), path.display());
        }
        println!("{} is valid", path.display());
        return Ok(());
    }

    let config = load_config(opt.config.as_ref())?;
    let mode = opt.layout.unwrap_or(config.settings.layout.mode);
    let frame = Rect::new(0.0, 0.0, opt.width, opt.height);
    let mut session = Session::new(config, mode, frame, opt.json);

    let reader: Box<dyn BufRead> = match &opt.script {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let parts = parse_command(&line);
        if let Err(e) = session.run(&parts) {
            error!(line = lineno + 1, "{e:#}");
        }
    }
    session.print()
}

#[cfg(panic = "unwind")]
fn install_panic_hook() {
    // Abort on panic so a broken invariant never leaves a half-applied layout behind.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        original_hook(info);
        std::process::abort();
    }));
}

#[cfg(not(panic = "unwind"))]
fn install_panic_hook() {}
