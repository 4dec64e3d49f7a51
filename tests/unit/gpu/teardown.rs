use super::*;

#[test]
fn failing_step_does_not_stop_the_run() {
    let steps = [
        TeardownStep::UnbindCurrent,
        TeardownStep::DestroySurface(OutputTarget::Display),
        TeardownStep::TerminateDisplay,
    ];
    let report = run_steps(&steps, |step| match step {
        TeardownStep::DestroySurface(_) => Err(PlatformError::BadSurface),
        _ => Ok(()),
    });
    assert_eq!(report.attempted, steps);
    assert_eq!(report.failures.len(), 1);
    assert!(!report.is_clean());
    match &report.failures[0] {
        EvaError::TeardownStepFailed { step, reason } => {
            assert_eq!(step, "destroy display surface");
            assert_eq!(reason, "bad surface");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn empty_plan_is_a_clean_noop() {
    let report = run_steps(&[], |_| Ok(()));
    assert!(report.is_clean());
    assert!(report.is_noop());
}
