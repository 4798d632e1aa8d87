//! Turns process signals into an interruptible pause for the control loop.

use std::cell::Cell;
use std::fmt;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use log::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "SIGINT"),
            Self::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Returned by [`Interrupt::pause`] once a cancellation request arrived.
/// `None` means the listener went away without delivering a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted(pub Option<Signal>);

pub struct Interrupt {
    signal_rx: Receiver<Signal>,
    interrupted: Cell<Option<Interrupted>>,
}

impl Interrupt {
    /// Installs handlers for SIGINT and SIGTERM (Ctrl-C on other platforms)
    /// on a separate thread. Handlers are in place when this returns and
    /// stay installed for the rest of the process, so later signals are
    /// swallowed instead of killing the process mid-shutdown.
    pub fn listen() -> Result<Self, Box<dyn std::error::Error>> {
        let (signal_tx, signal_rx) = channel::<Signal>();
        let (ready_tx, ready_rx) = channel::<std::io::Result<()>>();

        std::thread::Builder::new()
            .name("signals".into())
            .spawn(move || listener(signal_tx, ready_tx))?;

        ready_rx.recv()??;
        Ok(Self::from_receiver(signal_rx))
    }

    /// An interrupt that fires when something is sent through the returned
    /// sender.
    pub fn manual() -> (Sender<Signal>, Self) {
        let (signal_tx, signal_rx) = channel::<Signal>();
        (signal_tx, Self::from_receiver(signal_rx))
    }

    fn from_receiver(signal_rx: Receiver<Signal>) -> Self {
        Self {
            signal_rx,
            interrupted: Cell::new(None),
        }
    }

    /// Blocks for `duration`, returning early if interrupted.
    pub fn pause(&self, duration: Duration) -> Result<(), Interrupted> {
        if let Some(interrupted) = self.interrupted.get() {
            return Err(interrupted);
        }

        let interrupted = match self.signal_rx.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => return Ok(()),
            Ok(signal) => Interrupted(Some(signal)),
            Err(RecvTimeoutError::Disconnected) => Interrupted(None),
        };

        self.interrupted.set(Some(interrupted));
        Err(interrupted)
    }

    #[cfg(test)]
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.get().is_some()
    }
}

fn listener(signal_tx: Sender<Signal>, ready_tx: Sender<std::io::Result<()>>) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    runtime.block_on(async move {
        #[cfg(unix)]
        let received = {
            use tokio::signal::unix::{signal, SignalKind};

            let streams = signal(SignalKind::interrupt()).and_then(|i| Ok((i, signal(SignalKind::terminate())?)));
            let (mut interrupt, mut terminate) = match streams {
                Ok(streams) => streams,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));

            tokio::select! {
                _ = interrupt.recv() => Signal::Interrupt,
                _ = terminate.recv() => Signal::Terminate,
            }
        };

        #[cfg(not(unix))]
        let received = {
            let ctrl_c = tokio::signal::ctrl_c();
            let _ = ready_tx.send(Ok(()));
            if let Err(e) = ctrl_c.await {
                error!("Failed to wait for Ctrl-C: {:?}", e);
                return;
            }
            Signal::Interrupt
        };

        debug!("Received {}", received);
        let _ = signal_tx.send(received);
    });
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn should_sleep_when_not_interrupted() {
        let (_signal_tx, interrupt) = Interrupt::manual();
        let start = Instant::now();
        assert_eq!(interrupt.pause(Duration::from_millis(20)), Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(!interrupt.is_interrupted());
    }

    #[test]
    fn should_return_early_when_signalled() {
        let (signal_tx, interrupt) = Interrupt::manual();
        signal_tx.send(Signal::Terminate).unwrap();

        let start = Instant::now();
        assert_eq!(interrupt.pause(Duration::from_secs(10)), Err(Interrupted(Some(Signal::Terminate))));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn should_wake_up_from_another_thread() {
        let (signal_tx, interrupt) = Interrupt::manual();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            signal_tx.send(Signal::Interrupt).unwrap();
        });

        assert_eq!(interrupt.pause(Duration::from_secs(10)), Err(Interrupted(Some(Signal::Interrupt))));
        handle.join().unwrap();
    }

    #[test]
    fn should_stay_interrupted() {
        let (signal_tx, interrupt) = Interrupt::manual();
        signal_tx.send(Signal::Interrupt).unwrap();

        assert!(interrupt.pause(Duration::ZERO).is_err());
        assert_eq!(interrupt.pause(Duration::ZERO), Err(Interrupted(Some(Signal::Interrupt))));
        assert!(interrupt.is_interrupted());
    }

    #[test]
    fn should_treat_lost_listener_as_interrupt() {
        let (signal_tx, interrupt) = Interrupt::manual();
        drop(signal_tx);
        assert_eq!(interrupt.pause(Duration::from_secs(10)), Err(Interrupted(None)));
    }
}
