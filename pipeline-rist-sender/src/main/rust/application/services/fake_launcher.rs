//! In-memory `ProcessLauncher` for exercising the supervisor without real processes

use std::fs::File;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::ports::{ChildProcess, ProcessLauncher};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeEvent {
    Launched(String),
    Terminated(String),
    Killed(String),
}

#[derive(Default)]
struct FakeState {
    events: Mutex<Vec<FakeEvent>>,
    children: Mutex<Vec<(String, Arc<AtomicBool>)>>,
    failing: Mutex<Vec<String>>,
    stubborn: Mutex<Vec<String>>,
    next_pid: AtomicU32,
    launch_delay: Mutex<Duration>,
}

impl FakeState {
    fn record(&self, event: FakeEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Clone, Default)]
pub struct FakeLauncher {
    state: Arc<FakeState>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FakeEvent> {
        self.state.events.lock().unwrap().clone()
    }

    /// Launching `program` fails with `NotFound`
    pub fn fail_program(&self, program: &str) {
        self.state.failing.lock().unwrap().push(program.to_string());
    }

    /// `program` ignores SIGTERM and only dies on kill
    pub fn ignore_terminate(&self, program: &str) {
        self.state.stubborn.lock().unwrap().push(program.to_string());
    }

    /// Every launch sleeps this long before returning
    pub fn set_launch_delay(&self, delay: Duration) {
        *self.state.launch_delay.lock().unwrap() = delay;
    }

    /// Simulate `program` crashing on its own
    pub fn exit_all(&self, program: &str) {
        for (name, alive) in self.state.children.lock().unwrap().iter() {
            if name == program {
                alive.store(false, Ordering::SeqCst);
            }
        }
    }

    pub fn live_count(&self, program: &str) -> usize {
        self.state
            .children
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, alive)| name == program && alive.load(Ordering::SeqCst))
            .count()
    }

    pub fn launch_count(&self, program: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == FakeEvent::Launched(program.to_string()))
            .count()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, argv: &[String], _log_sink: Option<&File>) -> io::Result<Box<dyn ChildProcess>> {
        let program = argv[0].clone();
        if self.state.failing.lock().unwrap().contains(&program) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such binary"));
        }

        let delay = *self.state.launch_delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let alive = Arc::new(AtomicBool::new(true));
        self.state
            .children
            .lock()
            .unwrap()
            .push((program.clone(), alive.clone()));
        self.state.record(FakeEvent::Launched(program.clone()));

        let ignores_terminate = self.state.stubborn.lock().unwrap().contains(&program);
        Ok(Box::new(FakeChild {
            pid: 1000 + self.state.next_pid.fetch_add(1, Ordering::SeqCst),
            program,
            alive,
            ignores_terminate,
            state: self.state.clone(),
        }))
    }
}

struct FakeChild {
    pid: u32,
    program: String,
    alive: Arc<AtomicBool>,
    ignores_terminate: bool,
    state: Arc<FakeState>,
}

impl ChildProcess for FakeChild {
    fn id(&self) -> u32 {
        self.pid
    }

    fn try_wait(&mut self) -> io::Result<bool> {
        Ok(!self.alive.load(Ordering::SeqCst))
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.state.record(FakeEvent::Terminated(self.program.clone()));
        if !self.ignores_terminate {
            self.alive.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.state.record(FakeEvent::Killed(self.program.clone()));
        self.alive.store(false, Ordering::SeqCst);
        Ok(())
    }
}
