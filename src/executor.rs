//! Script execution.
//!
//! An invocation walks a script's targets strictly in order: wait the
//! per-target delay, then click. The target list is an owned snapshot fixed
//! at invocation time, so concurrent edits to the script never affect an
//! in-flight run. Cancellation is cooperative and takes effect within one
//! target's granularity: it is honored before and during each wait and
//! before each click, never mid-click.
//!
//! Invocations are independent: any number may run concurrently (same or
//! different scripts) with no shared mutable state beyond the mutex on the
//! single physical pointer, which is held per primitive call and never
//! across a sleep.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Result;
use crate::pointer::PointerDriver;
use crate::script::Script;

/// How a single invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every target was clicked.
    Completed,
    /// The run was cancelled between targets.
    Cancelled,
}

/// Executes script invocations against a pointer driver.
#[derive(Clone)]
pub struct Executor {
    pointer: Arc<Mutex<dyn PointerDriver>>,
}

impl Executor {
    pub fn new(pointer: Arc<Mutex<dyn PointerDriver>>) -> Self {
        Self { pointer }
    }

    /// Run one invocation over an owned snapshot of the script.
    ///
    /// With `return_mouse` set, the pointer position is recorded before the
    /// first wait and restored after the walk -- after `return_delay_ms`,
    /// and even when the run was cancelled or a click failed partway
    /// through.
    pub async fn execute(&self, script: Script, cancel: CancellationToken) -> Result<RunOutcome> {
        if script.targets.is_empty() {
            return Ok(RunOutcome::Completed);
        }

        let origin = if script.return_mouse {
            Some(self.pointer.lock().position()?)
        } else {
            None
        };

        let mut outcome = Ok(RunOutcome::Completed);
        for (index, target) in script.targets.iter().enumerate() {
            if cancel.is_cancelled() {
                outcome = Ok(RunOutcome::Cancelled);
                break;
            }
            let mut cancelled = false;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => cancelled = true,
                _ = time::sleep(Duration::from_millis(target.delay_ms)) => {}
            }
            if cancelled || cancel.is_cancelled() {
                outcome = Ok(RunOutcome::Cancelled);
                break;
            }
            if let Err(e) = self.pointer.lock().click(target.x, target.y) {
                outcome = Err(e);
                break;
            }
            debug!(script = %script.name, index, x = target.x, y = target.y, "clicked target");
        }

        if let Some((x, y)) = origin {
            time::sleep(Duration::from_millis(script.return_delay_ms)).await;
            match self.pointer.lock().move_to(x, y) {
                Ok(()) => debug!(script = %script.name, x, y, "returned pointer to origin"),
                // a walk failure takes precedence over a restore failure
                Err(e) if outcome.is_ok() => outcome = Err(e),
                Err(e) => warn!(script = %script.name, "return to origin failed: {e}"),
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Target;
    use tokio::time::Instant;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum PointerOp {
        Click(i32, i32),
        MoveTo(i32, i32),
    }

    #[derive(Default)]
    struct MockState {
        position: (i32, i32),
        ops: Vec<(PointerOp, Instant)>,
        clicks_before_failure: Option<usize>,
    }

    /// Records every primitive call with its (paused-clock) timestamp and
    /// tracks the simulated pointer position.
    #[derive(Clone, Default)]
    struct MockPointer {
        state: Arc<Mutex<MockState>>,
    }

    impl MockPointer {
        fn at(x: i32, y: i32) -> Self {
            let mock = Self::default();
            mock.state.lock().position = (x, y);
            mock
        }

        fn failing_after(self, clicks: usize) -> Self {
            self.state.lock().clicks_before_failure = Some(clicks);
            self
        }

        fn ops(&self) -> Vec<PointerOp> {
            self.state.lock().ops.iter().map(|(op, _)| op.clone()).collect()
        }

        fn op_times(&self) -> Vec<Instant> {
            self.state.lock().ops.iter().map(|(_, t)| *t).collect()
        }
    }

    impl PointerDriver for MockPointer {
        fn click(&mut self, x: i32, y: i32) -> Result<()> {
            let mut state = self.state.lock();
            if let Some(remaining) = state.clicks_before_failure {
                if remaining == 0 {
                    return Err(crate::error::ClickScriptError::pointer("click", "mock"));
                }
                state.clicks_before_failure = Some(remaining - 1);
            }
            state.position = (x, y);
            state.ops.push((PointerOp::Click(x, y), Instant::now()));
            Ok(())
        }

        fn move_to(&mut self, x: i32, y: i32) -> Result<()> {
            let mut state = self.state.lock();
            state.position = (x, y);
            state.ops.push((PointerOp::MoveTo(x, y), Instant::now()));
            Ok(())
        }

        fn position(&mut self) -> Result<(i32, i32)> {
            Ok(self.state.lock().position)
        }
    }

    fn executor(mock: &MockPointer) -> Executor {
        let pointer: Arc<Mutex<dyn PointerDriver>> = Arc::new(Mutex::new(mock.clone()));
        Executor::new(pointer)
    }

    fn two_target_script(return_mouse: bool) -> Script {
        let mut script = Script::new("two targets");
        script.add_target(Target { x: 10, y: 10, delay_ms: 100 });
        script.add_target(Target { x: 20, y: 20, delay_ms: 50 });
        script.return_mouse = return_mouse;
        script.return_delay_ms = 500;
        script
    }

    #[tokio::test(start_paused = true)]
    async fn clicks_follow_their_delays_in_order() {
        let mock = MockPointer::at(5, 5);
        let start = Instant::now();

        let outcome = executor(&mock)
            .execute(two_target_script(false), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(mock.ops(), vec![PointerOp::Click(10, 10), PointerOp::Click(20, 20)]);

        let times = mock.op_times();
        assert!(times[0] - start >= Duration::from_millis(100));
        assert!(times[1] - times[0] >= Duration::from_millis(50));
        assert!(times[1] - start >= Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_targets_click_without_waiting() {
        let mock = MockPointer::at(0, 0);
        let mut script = Script::new("instant");
        script.add_target(Target { x: 1, y: 1, delay_ms: 0 });

        let outcome = executor(&mock)
            .execute(script, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(mock.ops(), vec![PointerOp::Click(1, 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_target_list_is_a_no_op() {
        let mock = MockPointer::at(5, 5);
        let mut script = Script::new("empty");
        script.return_mouse = true;

        let outcome = executor(&mock)
            .execute(script, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
        // no clicks, and no return step either
        assert!(mock.ops().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn returns_to_origin_recorded_at_start() {
        let mock = MockPointer::at(5, 5);
        let start = Instant::now();

        let outcome = executor(&mock)
            .execute(two_target_script(true), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed);

        // the pointer was moved by the clicks, yet returns to the position
        // recorded at invocation start
        assert_eq!(
            mock.ops(),
            vec![
                PointerOp::Click(10, 10),
                PointerOp::Click(20, 20),
                PointerOp::MoveTo(5, 5),
            ]
        );

        let times = mock.op_times();
        assert!(times[2] - times[1] >= Duration::from_millis(500));
        assert!(times[2] - start >= Duration::from_millis(650));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_between_targets_skips_the_rest() {
        let mock = MockPointer::at(5, 5);
        let cancel = CancellationToken::new();
        let exec = executor(&mock);

        let mut script = Script::new("cancelled");
        script.add_target(Target { x: 10, y: 10, delay_ms: 100 });
        script.add_target(Target { x: 20, y: 20, delay_ms: 200 });

        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move { exec.execute(script, cancel).await }
        });

        // cancel after the first click, during the second wait
        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(mock.ops(), vec![PointerOp::Click(10, 10)]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_run_still_returns_to_origin() {
        let mock = MockPointer::at(5, 5);
        let cancel = CancellationToken::new();
        let exec = executor(&mock);

        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move { exec.execute(two_target_script(true), cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(120)).await;
        cancel.cancel();

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(
            mock.ops(),
            vec![PointerOp::Click(10, 10), PointerOp::MoveTo(5, 5)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn already_cancelled_token_clicks_nothing() {
        let mock = MockPointer::at(5, 5);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = executor(&mock)
            .execute(two_target_script(false), cancel)
            .await
            .unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert!(mock.ops().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn click_failure_is_fatal_to_the_invocation_but_still_returns() {
        let mock = MockPointer::at(5, 5).failing_after(1);

        let err = executor(&mock)
            .execute(two_target_script(true), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::ClickScriptError::Pointer { .. }));

        // first click landed, second failed, return step still ran
        assert_eq!(
            mock.ops(),
            vec![PointerOp::Click(10, 10), PointerOp::MoveTo(5, 5)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_invocations_do_not_interfere() {
        let mock = MockPointer::at(0, 0);
        let exec = executor(&mock);

        let mut a = Script::new("a");
        a.add_target(Target { x: 1, y: 1, delay_ms: 50 });
        let mut b = Script::new("b");
        b.add_target(Target { x: 2, y: 2, delay_ms: 80 });

        let ta = tokio::spawn({
            let exec = exec.clone();
            async move { exec.execute(a, CancellationToken::new()).await }
        });
        let tb = tokio::spawn({
            let exec = exec.clone();
            async move { exec.execute(b, CancellationToken::new()).await }
        });

        assert_eq!(ta.await.unwrap().unwrap(), RunOutcome::Completed);
        assert_eq!(tb.await.unwrap().unwrap(), RunOutcome::Completed);

        let ops = mock.ops();
        assert_eq!(ops.len(), 2);
        assert!(ops.contains(&PointerOp::Click(1, 1)));
        assert!(ops.contains(&PointerOp::Click(2, 2)));
    }
}
