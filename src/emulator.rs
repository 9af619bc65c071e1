use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use chip8_interp::state::NUM_KEYS;
use chip8_interp::{
    Chip8, DISPLAY_HEIGHT, DISPLAY_WIDTH, DisplayBuffer, ExecState, Key, Rom, RomLayout,
};
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement};
use log::{error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Paragraph},
};

use crate::beep::{self, Beep};
use crate::keymap::{KEY_LEGEND, map_key};

pub const DEFAULT_FRAME_RATE: u64 = 60;
pub const DEFAULT_INSTRUCTIONS_PER_SECOND: u64 = 700;
/// Frames a key stays down when the terminal cannot report releases.
const KEY_HOLD_FRAMES: u32 = 6;

pub struct Settings {
    pub frame_rate: u64,
    pub ips: u64,
    pub rom: PathBuf,
    pub layout: RomLayout,
    pub seed: Option<u64>,
}

/// One decrement of each timer, stopping at zero. Called once per frame.
pub fn tick_timers(chip8: &mut Chip8) {
    chip8.set_delay_timer(chip8.delay_timer().saturating_sub(1));
    chip8.set_sound_timer(chip8.sound_timer().saturating_sub(1));
}

/// Turns terminal key events into keypad changes.
///
/// Terminals that report key releases drive the keypad directly. Otherwise a
/// press holds the key down for a few frames and auto-repeat keeps it held.
pub struct InputSource {
    reports_releases: bool,
    hold: [u32; NUM_KEYS],
}

impl InputSource {
    pub fn new(reports_releases: bool) -> Self {
        InputSource {
            reports_releases,
            hold: [0; NUM_KEYS],
        }
    }

    pub fn handle(&mut self, chip8: &mut Chip8, key: Key, kind: KeyEventKind) {
        match kind {
            KeyEventKind::Press | KeyEventKind::Repeat => {
                if !self.reports_releases {
                    self.hold[usize::from(key.index())] = KEY_HOLD_FRAMES;
                }
                if !chip8.is_key_pressed(key) {
                    chip8.set_key(key, true);
                }
            }
            KeyEventKind::Release => chip8.set_key(key, false),
        }
    }

    pub fn end_frame(&mut self, chip8: &mut Chip8) {
        if self.reports_releases {
            return;
        }
        for key in Key::ALL {
            let frames = &mut self.hold[usize::from(key.index())];
            if *frames == 0 {
                continue;
            }
            *frames -= 1;
            if *frames == 0 {
                chip8.set_key(key, false);
            }
        }
    }
}

/// Text rendering of the display, one line per row.
pub fn screen_text(display: &DisplayBuffer) -> String {
    let mut text = String::with_capacity((DISPLAY_WIDTH + 1) * DISPLAY_HEIGHT * 3);
    for row in display.rows() {
        text.extend(row.iter().by_vals().map(|lit| if lit { '█' } else { ' ' }));
        text.push('\n');
    }
    text
}

/// Bordered 64x32 screen centred at the top, key legend under it.
fn split_screen(area: Rect) -> (Rect, Rect) {
    let [top, legend, _] = Layout::vertical([
        Constraint::Length(DISPLAY_HEIGHT as u16 + 2),
        Constraint::Length(7),
        Constraint::Min(0),
    ])
    .areas(area);
    let [screen] = Layout::horizontal([Constraint::Length(DISPLAY_WIDTH as u16 + 2)])
        .flex(Flex::Center)
        .areas(top);
    (screen, legend)
}

fn open_terminal(reports_releases: bool) -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = std::io::stdout();
    if reports_releases {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

/// Runs every step and keeps the first failure.
fn first_failure<const N: usize>(steps: [io::Result<()>; N]) -> io::Result<()> {
    steps.into_iter().collect()
}

fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    reports_releases: bool,
) -> anyhow::Result<()> {
    let popped = if reports_releases {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
    } else {
        Ok(())
    };
    first_failure([popped, terminal.clear(), disable_raw_mode()])
        .context("failed to restore the terminal")
}

pub struct Emulator {
    settings: Settings,
    chip8: Chip8,
    rom: Rom,
    beeper: Beep,
}

impl Emulator {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let rom = Rom::from_path(&settings.rom, settings.layout)?;
        let mut chip8 = match settings.seed {
            Some(seed) => Chip8::with_rng(StdRng::seed_from_u64(seed)),
            None => Chip8::new(),
        };
        chip8.load_into_memory(rom.memory_image());

        Ok(Emulator {
            settings,
            chip8,
            rom,
            beeper: Beep::new(beep::DEFAULT_FREQUENCY),
        })
    }

    fn draw(&self, frame: &mut ratatui::Frame, area: Rect) {
        let (screen_area, legend_area) = split_screen(area);

        let title = match self.chip8.exec_state() {
            ExecState::Running => self.rom.name().to_string(),
            ExecState::WaitingForKey(_) => format!("{} (waiting for key)", self.rom.name()),
        };
        frame.render_widget(
            Paragraph::new(screen_text(self.chip8.display()))
                .block(Block::bordered().title(title))
                .style(Style::default().fg(Color::White)),
            screen_area,
        );
        frame.render_widget(
            Paragraph::new(KEY_LEGEND)
                .alignment(Alignment::Center)
                .block(Block::bordered().title("Keypad  (Esc quit, Backspace reset)"))
                .style(Style::default().fg(Color::Yellow)),
            legend_area,
        );
    }

    fn reload(&mut self) {
        info!("resetting {}", self.rom.name());
        self.chip8.reset();
        self.chip8.load_into_memory(self.rom.memory_image());
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let reports_releases = supports_keyboard_enhancement().unwrap_or(false);

        enable_raw_mode()?;
        let mut terminal = match open_terminal(reports_releases) {
            Ok(terminal) => terminal,
            Err(e) => {
                let _ = disable_raw_mode();
                return Err(e);
            }
        };

        let result = self.main_loop(&mut terminal, InputSource::new(reports_releases));
        let restored = restore_terminal(&mut terminal, reports_releases);
        self.beeper.silence();

        if let Err(e) = &result {
            error!("emulation stopped: {e:#}");
        }
        result.and(restored)
    }

    fn main_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        mut input: InputSource,
    ) -> anyhow::Result<()> {
        let frame_rate = self.settings.frame_rate.max(1);
        let frame_duration = Duration::from_secs_f64(1.0 / frame_rate as f64);
        let instructions_per_frame = (self.settings.ips / frame_rate).max(1);
        info!("running at {frame_rate} Hz, {instructions_per_frame} instructions per frame");
        terminal.clear()?;

        loop {
            let frame_start = Instant::now();

            while event::poll(Duration::ZERO)? {
                let Event::Key(key) = event::read()? else {
                    continue;
                };
                match key.code {
                    KeyCode::Esc if key.kind != KeyEventKind::Release => return Ok(()),
                    KeyCode::Backspace if key.kind == KeyEventKind::Press => self.reload(),
                    code => {
                        if let Some(mapped) = map_key(code) {
                            input.handle(&mut self.chip8, mapped, key.kind);
                        }
                    }
                }
            }

            tick_timers(&mut self.chip8);
            self.beeper.follow(self.chip8.sound_timer());

            for _ in 0..instructions_per_frame {
                self.chip8
                    .cycle()
                    .with_context(|| format!("at PC {:#05X}", self.chip8.pc()))?;
            }

            terminal.draw(|frame| {
                let area = frame.area();
                self.draw(frame, area);
            })?;
            input.end_frame(&mut self.chip8);

            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
        }
    }
}
