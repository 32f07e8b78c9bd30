//! Scenario harness.
//!
//! Each numbered scenario drives boxes through one behaviour and reports a
//! failed check as an error rather than aborting. `run_with_timeout` runs a
//! scenario on its own thread and gives up waiting after a wall-clock bound.

mod scenarios;
mod tracked;

use std::{io, sync::mpsc, thread, time::Duration};

use thiserror::Error;

pub use scenarios::{run, SCENARIO_COUNT};
pub use tracked::Tracked;

#[derive(Debug, Error)]
pub enum HarnessError
{
    #[error("scenario {0} does not exist")]
    Unknown(u32),

    #[error("scenario {scenario} failed: {reason}")]
    Failed
    {
        scenario: u32,
        reason: String,
    },

    #[error("scenario {0} did not finish within {1:?}")]
    TimedOut(u32, Duration),

    #[error("scenario {0} panicked")]
    Panicked(u32),

    #[error("could not start scenario thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Run scenario `n`, waiting at most `timeout` for it.
///
/// A scenario that overruns keeps its thread; the caller is expected to
/// exit soon after.
pub fn run_with_timeout(n: u32, timeout: Duration) -> Result<(), HarnessError>
{
    if !(1..=SCENARIO_COUNT).contains(&n) {
        return Err(HarnessError::Unknown(n));
    }
    supervise(n, timeout, move || run(n))
}

fn supervise<F>(n: u32, timeout: Duration, f: F) -> Result<(), HarnessError>
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name(format!("scenario-{}", n))
        .spawn(move || {
            let _ = tx.send(f());
        })?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HarnessError::Failed {
            scenario: n,
            reason: format!("{:#}", e),
        }),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            log::warn!("scenario {} still running after {:?}", n, timeout);
            Err(HarnessError::TimedOut(n, timeout))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(HarnessError::Panicked(n)),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn overrun_is_reported()
    {
        let res = supervise(0, Duration::from_millis(20), || {
            thread::sleep(Duration::from_secs(2));
            Ok(())
        });
        assert!(matches!(res, Err(HarnessError::TimedOut(0, _))));
    }

    #[test]
    fn failure_keeps_its_reason()
    {
        let res = supervise(0, Duration::from_secs(5), || anyhow::bail!("nope"));
        match res {
            Err(HarnessError::Failed { reason, .. }) => assert_eq!(reason, "nope"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn panic_is_reported()
    {
        let res = supervise(0, Duration::from_secs(5), || panic!("boom"));
        assert!(matches!(res, Err(HarnessError::Panicked(0))));
    }

    #[test]
    fn unknown_scenario()
    {
        assert!(matches!(
            run_with_timeout(SCENARIO_COUNT + 1, Duration::from_secs(1)),
            Err(HarnessError::Unknown(_))
        ));
        assert!(matches!(
            run_with_timeout(0, Duration::from_secs(1)),
            Err(HarnessError::Unknown(0))
        ));
    }
}
