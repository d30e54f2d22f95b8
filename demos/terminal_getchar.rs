//! Terminal GetChar demo - capture keystrokes from the terminal into a keyqueue.
//!
//! Run with: cargo run --example terminal_getchar
//!
//! Type to fill the queue; the main loop drains it every 10 ms and prints each
//! key with its modifiers and time. Press 'q' to exit. Pass `--exclusive` to
//! start in exclusive mode (Ctrl+C releases it). Pass `--capacity N` to try
//! a small queue and watch overflow being reported.

use crossterm::{
    event::{
        self, DisableFocusChange, EnableFocusChange, Event as CEvent, KeyCode, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use keyqueue::{
    CaptureConfig, Error, Event, EventSource, KeyCapture, KeyEventHandler, Modifiers, QueueRead,
};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Event source reading crossterm events on a background thread.
#[derive(Default)]
struct TerminalSource {
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl EventSource for TerminalSource {
    fn subscribe(&mut self, handler: Arc<dyn KeyEventHandler>) -> keyqueue::Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }
        // Report an unusable terminal as a subscribe error.
        event::poll(Duration::ZERO).map_err(|e| Error::SubscribeFailed(e.to_string()))?;
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        self.thread_handle = Some(std::thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                match event::poll(Duration::from_millis(20)) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(_) => break,
                }
                let Ok(raw) = event::read() else { break };
                if let Some(event) = translate(raw) {
                    // A terminal has nowhere to redispatch to.
                    let _ = handler.handle_event(&event);
                }
            }
        }));
        Ok(())
    }

    fn unsubscribe(&mut self) -> keyqueue::Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(Error::NotRunning);
        }
        if let Some(handle) = self.thread_handle.take() {
            handle
                .join()
                .map_err(|_| Error::UnsubscribeFailed("terminal reader panicked".into()))?;
        }
        Ok(())
    }
}

fn translate(raw: CEvent) -> Option<Event> {
    match raw {
        CEvent::FocusGained => Some(Event::focus_gained()),
        CEvent::FocusLost => Some(Event::focus_lost()),
        CEvent::Key(key) if key.kind != KeyEventKind::Release => {
            let char = match key.code {
                KeyCode::Char(c) => c,
                KeyCode::Enter => '\r',
                KeyCode::Tab => '\t',
                KeyCode::Backspace => '\u{8}',
                KeyCode::Esc => '\u{1b}',
                _ => return None,
            };
            Some(Event::key_typed(char, char as u32, convert_modifiers(key.modifiers)))
        }
        _ => None,
    }
}

fn convert_modifiers(mods: KeyModifiers) -> Modifiers {
    let mut mask = Modifiers::empty();
    if mods.contains(KeyModifiers::SHIFT) {
        mask |= Modifiers::SHIFT;
    }
    if mods.contains(KeyModifiers::CONTROL) {
        mask |= Modifiers::CONTROL;
    }
    if mods.contains(KeyModifiers::ALT) {
        mask |= Modifiers::ALT;
    }
    if mods.intersects(KeyModifiers::SUPER | KeyModifiers::META) {
        mask |= Modifiers::META;
    }
    mask
}

/// Leaves raw mode and focus reporting when dropped, on every exit path.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = RawModeGuard;
        execute!(io::stdout(), EnableFocusChange)?;
        Ok(guard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), DisableFocusChange);
        let _ = disable_raw_mode();
    }
}

fn parse_args() -> CaptureConfig {
    let mut config = CaptureConfig::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--exclusive" => config = config.with_redispatch(false),
            "--capacity" => {
                if let Some(n) = args.next().and_then(|n| n.parse().ok()) {
                    config = config.with_capacity(n);
                }
            }
            _ => {}
        }
    }
    config
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = parse_args();
    println!("keyqueue terminal demo");
    println!(
        "capacity {}, redispatch {}. Type keys, 'q' to exit.\n",
        config.capacity, config.redispatch
    );

    let mut capture = KeyCapture::new(TerminalSource::default(), config)?;

    let _raw = RawModeGuard::enable()?;
    capture.register()?;

    let mut was_focused = capture.is_focused();
    'outer: loop {
        loop {
            match capture.pop() {
                QueueRead::Key(event) => {
                    print!(
                        "char {:>5}  mods {:<12}  t={:.4}s\r\n",
                        event.code_point(),
                        capture.modifier_names(),
                        capture.event_time_secs()
                    );
                    if event.character == 'q' {
                        break 'outer;
                    }
                }
                QueueRead::Empty => break,
                QueueRead::Overflow => {
                    print!("queue overflowed, keys were lost; clearing\r\n");
                    capture.clear();
                    break;
                }
            }
        }

        if capture.is_focused() != was_focused {
            was_focused = capture.is_focused();
            print!("focus: {:?}\r\n", capture.focus_state());
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    capture.unregister()?;
    Ok(())
}
