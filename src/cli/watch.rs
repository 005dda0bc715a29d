use std::{io::Write, time::Duration};

use anyhow::Result;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    storage::{snapshot::load_planner, StateStorage},
    utils::clock::Clock,
};

use super::status::render_status;

const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(1);
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Redraws the status screen once per period until cancelled. State is reloaded on every tick so
/// changes made by other invocations show up.
pub struct StatusWatcher<S, W> {
    storage: S,
    clock: Box<dyn Clock>,
    shutdown: CancellationToken,
    period: Duration,
    out: W,
    colored: bool,
}

impl<S: StateStorage, W: Write> StatusWatcher<S, W> {
    pub fn new(
        storage: S,
        clock: Box<dyn Clock>,
        shutdown: CancellationToken,
        out: W,
        colored: bool,
    ) -> Self {
        Self {
            storage,
            clock,
            shutdown,
            period: DEFAULT_REFRESH_PERIOD,
            out,
            colored,
        }
    }

    async fn draw(&mut self) -> Result<()> {
        let planner = load_planner(&self.storage).await;
        let frame = render_status(&planner, self.clock.time(), self.colored);
        write!(self.out, "{CLEAR_SCREEN}{frame}")?;
        self.out.flush()?;
        Ok(())
    }

    /// Runs the refresh loop. Returns the number of frames drawn.
    pub async fn run(&mut self) -> Result<usize> {
        let mut tick = self.clock.instant();
        let mut frames = 0;
        loop {
            tick += self.period;

            self.draw()
                .await
                .inspect_err(|e| error!("Couldn't draw status {e:?}"))?;
            frames += 1;
            debug!("Drew frame {frames}");

            select! {
                _ = self.shutdown.cancelled() => {
                    info!("Stopped watching after {frames} frames");
                    return Ok(frames)
                }
                _ = self.clock.sleep_until(tick) => ()
            }
        }
    }
}

/// Cancels `cancellation` on Ctrl-C. Returns early if someone else cancels first.
pub async fn detect_shutdown(cancellation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancellation.cancel();
        },
        _ = cancellation.cancelled() => (),
    };
}

pub async fn run_watch(storage: impl StateStorage, clock: impl Clock, colored: bool) -> Result<()> {
    let shutdown = CancellationToken::new();
    let mut watcher = StatusWatcher::new(
        storage,
        Box::new(clock),
        shutdown.clone(),
        std::io::stdout(),
        colored,
    );

    let (_, result) = tokio::join!(detect_shutdown(shutdown.clone()), async {
        let result = watcher.run().await;
        // A failed watcher must not leave the signal listener waiting forever.
        shutdown.cancel();
        result
    });
    result?;
    Ok(())
}
