// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

use {
    super::*,
    std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc, Condvar, Mutex,
        },
        thread,
    },
    tracing::{debug, error, warn},
};

/// The stream to emit silence to I2S interface.
pub trait SilenceStream {
    /// Write one buffer of silence. The call blocks till the stream accepts it.
    fn write_silence(&mut self) -> Result<(), Error>;
}

/// The backend to drive clock of I2S interface shared by the amplifiers.
pub trait ClockBackend: Send + 'static {
    type Stream: SilenceStream;

    /// Enable or disable I2S interface.
    fn enable_i2s(&mut self, enable: bool) -> Result<(), Error>;

    /// Open the stream of silence.
    fn open_stream(&mut self) -> Result<Self::Stream, Error>;
}

#[derive(Default)]
struct Readiness {
    writing: Mutex<bool>,
    cond: Condvar,
}

impl Readiness {
    fn signal(&self) {
        let mut writing = match self.writing.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *writing = true;
        self.cond.notify_one();
    }

    fn wait(&self) {
        let mut writing = match self.writing.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while !*writing {
            writing = match self.cond.wait(writing) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}

// Signal readiness at the first write, or at leaving the thread in any way.
struct ReadinessGuard {
    readiness: Arc<Readiness>,
    signaled: bool,
}

impl ReadinessGuard {
    fn signal(&mut self) {
        if !self.signaled {
            self.readiness.signal();
            self.signaled = true;
        }
    }
}

impl Drop for ReadinessGuard {
    fn drop(&mut self) {
        self.signal();
    }
}

fn write_silence<C: ClockBackend>(
    mut clock: C,
    initializing: Arc<AtomicBool>,
    mut guard: ReadinessGuard,
) {
    if let Err(e) = clock.enable_i2s(true) {
        error!("Failed to enable I2S interface: {}", e);
        return;
    }

    match clock.open_stream() {
        Ok(mut stream) => loop {
            if let Err(e) = stream.write_silence() {
                error!("Failed to write silence: {}", e);
            }
            guard.signal();

            if !initializing.load(Ordering::SeqCst) {
                break;
            }
        },
        Err(e) => error!("Failed to open stream: {}", e),
    }

    if let Err(e) = clock.enable_i2s(false) {
        warn!("Failed to disable I2S interface: {}", e);
    }
}

/// The writer thread to keep I2S interface clocked while the amplifier is initialized.
#[derive(Debug)]
pub struct KeepAlive {
    initializing: Arc<AtomicBool>,
    th: Option<thread::JoinHandle<()>>,
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.stop();
    }
}

impl KeepAlive {
    /// Launch the writer thread, then block till it starts writing. When the writer fails to
    /// start streaming, it returns as well.
    pub fn start<C: ClockBackend>(name: &str, clock: C) -> Result<Self, Error> {
        let initializing = Arc::new(AtomicBool::new(true));
        let readiness = Arc::new(Readiness::default());

        let guard = ReadinessGuard {
            readiness: readiness.clone(),
            signaled: false,
        };
        let flag = initializing.clone();
        let th = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || write_silence(clock, flag, guard))
            .map_err(|e| {
                let msg = format!("Fail to spawn {}: {}", name, e);
                Error::new(FileError::Failed, &msg)
            })?;

        readiness.wait();
        debug!("{} started", name);

        Ok(Self {
            initializing,
            th: Some(th),
        })
    }

    /// Stop writing and join the thread.
    pub fn stop(&mut self) {
        self.initializing.store(false, Ordering::SeqCst);

        if let Some(th) = self.th.take() {
            if th.join().is_err() {
                warn!("Fail to join keep-alive writer");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.th.is_some()
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::simulator::*,
        std::sync::atomic::AtomicUsize,
    };

    #[test]
    fn keep_alive_writes_till_stopped() {
        let clock = SimClock::default();
        let events = clock.events.clone();

        let mut keep_alive = KeepAlive::start("test keep-alive", clock).unwrap();
        assert!(keep_alive.is_running());
        // At least one buffer is written before returning.
        assert!(events.writes.load(Ordering::SeqCst) > 0);
        assert_eq!(*events.i2s.lock().unwrap(), vec![true]);

        keep_alive.stop();
        assert!(!keep_alive.is_running());
        assert_eq!(*events.i2s.lock().unwrap(), vec![true, false]);

        let count = events.writes.load(Ordering::SeqCst);
        thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(events.writes.load(Ordering::SeqCst), count);
    }

    #[test]
    fn keep_alive_signals_on_failures() {
        let mut clock = SimClock::default();
        clock.fail_i2s = true;
        let events = clock.events.clone();
        let mut keep_alive = KeepAlive::start("test keep-alive", clock).unwrap();
        keep_alive.stop();
        assert_eq!(events.writes.load(Ordering::SeqCst), 0);
        assert!(events.i2s.lock().unwrap().is_empty());

        let mut clock = SimClock::default();
        clock.fail_stream = true;
        let events = clock.events.clone();
        let mut keep_alive = KeepAlive::start("test keep-alive", clock).unwrap();
        keep_alive.stop();
        assert_eq!(events.writes.load(Ordering::SeqCst), 0);
        // I2S interface is disabled again.
        assert_eq!(*events.i2s.lock().unwrap(), vec![true, false]);

        let mut clock = SimClock::default();
        clock.fail_write = true;
        let events = clock.events.clone();
        let mut keep_alive = KeepAlive::start("test keep-alive", clock).unwrap();
        keep_alive.stop();
        assert!(events.writes.load(Ordering::SeqCst) > 0);
    }

    struct PanicClock(Arc<AtomicUsize>);

    impl ClockBackend for PanicClock {
        type Stream = SimStream;

        fn enable_i2s(&mut self, _: bool) -> Result<(), Error> {
            self.0.fetch_add(1, Ordering::SeqCst);
            panic!("simulated panic");
        }

        fn open_stream(&mut self) -> Result<Self::Stream, Error> {
            unreachable!();
        }
    }

    #[test]
    fn keep_alive_signals_on_panic() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut keep_alive = KeepAlive::start("test keep-alive", PanicClock(calls.clone())).unwrap();
        keep_alive.stop();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn keep_alive_stopped_by_drop() {
        let clock = SimClock::default();
        let events = clock.events.clone();
        {
            let _keep_alive = KeepAlive::start("test keep-alive", clock).unwrap();
        }
        assert_eq!(*events.i2s.lock().unwrap(), vec![true, false]);
    }
}
