use assetdag::engine::{
    CoreCommand, CoreRuntime, RuntimeEvent, RuntimeOptions, ScheduledStage, StageOutcome,
    StageRunState, StageTracker, TriggerReason,
};
use proptest::prelude::*;

fn new_core(stages: &[&str], exit_when_idle: bool) -> CoreRuntime {
    CoreRuntime::new(
        StageTracker::new(stages.iter().copied()),
        RuntimeOptions { exit_when_idle },
    )
}

fn trigger(stage: &str) -> RuntimeEvent {
    RuntimeEvent::StageTriggered {
        stage: stage.to_string(),
        reason: TriggerReason::FileWatch,
    }
}

fn complete(stage: &str, outcome: StageOutcome) -> RuntimeEvent {
    RuntimeEvent::StageCompleted {
        stage: stage.to_string(),
        outcome,
    }
}

fn ok() -> StageOutcome {
    StageOutcome::Success { written: 1 }
}

fn dispatched(commands: &[CoreCommand]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::DispatchStages(s) => Some(s.iter().map(|s| s.name.clone())),
            CoreCommand::RequestExit => None,
        })
        .flatten()
        .collect()
}

#[test]
fn idle_stage_is_dispatched_immediately() {
    let mut core = new_core(&["styles"], false);

    let step = core.step(trigger("styles"));
    assert!(step.keep_running);
    assert_eq!(
        step.commands,
        vec![CoreCommand::DispatchStages(vec![ScheduledStage {
            name: "styles".into(),
            run_id: 1,
        }])]
    );
    assert_eq!(
        core.tracker().run_state_of("styles"),
        Some(StageRunState::Running)
    );
}

#[test]
fn triggers_during_a_run_coalesce_into_one_rerun() {
    let mut core = new_core(&["styles"], false);

    core.step(trigger("styles"));
    for _ in 0..5 {
        let step = core.step(trigger("styles"));
        assert!(dispatched(&step.commands).is_empty());
    }
    assert_eq!(
        core.tracker().run_state_of("styles"),
        Some(StageRunState::RunningWithPending)
    );

    let step = core.step(complete("styles", ok()));
    assert_eq!(dispatched(&step.commands), vec!["styles"]);
    assert_eq!(core.tracker().runs_started("styles"), 2);

    let step = core.step(complete("styles", ok()));
    assert!(dispatched(&step.commands).is_empty());
    assert!(core.is_idle());
}

#[test]
fn stages_run_independently() {
    let mut core = new_core(&["images", "styles"], false);

    core.step(trigger("styles"));
    let step = core.step(trigger("images"));
    assert_eq!(dispatched(&step.commands), vec!["images"]);

    core.step(complete("styles", StageOutcome::Failed("boom".into())));
    assert_eq!(
        core.tracker().run_state_of("images"),
        Some(StageRunState::Running)
    );
    assert_eq!(
        core.tracker().run_state_of("styles"),
        Some(StageRunState::Idle)
    );
}

#[test]
fn failures_are_not_retried() {
    let mut core = new_core(&["scripts"], false);

    core.step(trigger("scripts"));
    let step = core.step(complete("scripts", StageOutcome::Failed("syntax".into())));
    assert!(dispatched(&step.commands).is_empty());
    assert_eq!(core.report().failed(), vec!["scripts"]);

    // The next change runs it again and a success clears the failure.
    core.step(trigger("scripts"));
    core.step(complete("scripts", ok()));
    assert!(core.report().failed().is_empty());
    assert_eq!(core.report().succeeded(), vec!["scripts"]);
}

#[test]
fn unknown_stage_trigger_is_ignored() {
    let mut core = new_core(&["styles"], false);
    let step = core.step(trigger("otf2ttf"));
    assert!(step.commands.is_empty());
    assert!(core.is_idle());
}

#[test]
fn one_shot_exits_once_every_stage_is_idle() {
    let mut core = new_core(&["markup", "styles"], true);

    core.step(trigger("markup"));
    core.step(trigger("styles"));

    let step = core.step(complete("markup", ok()));
    assert!(step.keep_running);

    let step = core.step(complete("styles", StageOutcome::Failed("x".into())));
    assert!(!step.keep_running);
    assert!(step.commands.contains(&CoreCommand::RequestExit));

    let report = core.into_report();
    assert_eq!(report.succeeded(), vec!["markup"]);
    assert_eq!(report.failed(), vec!["styles"]);
    assert!(!report.is_success());
}

#[test]
fn one_shot_waits_for_pending_reruns() {
    let mut core = new_core(&["styles"], true);

    core.step(trigger("styles"));
    core.step(trigger("styles"));

    let step = core.step(complete("styles", ok()));
    assert!(step.keep_running);
    assert_eq!(dispatched(&step.commands), vec!["styles"]);

    let step = core.step(complete("styles", ok()));
    assert!(!step.keep_running);
}

#[test]
fn shutdown_stops_the_loop() {
    let mut core = new_core(&["styles"], false);
    core.step(trigger("styles"));
    let step = core.step(RuntimeEvent::ShutdownRequested);
    assert!(!step.keep_running);
}

#[test]
fn run_ids_increase_across_stages() {
    let mut core = new_core(&["a", "b"], false);
    let ids: Vec<u64> = ["a", "b"]
        .iter()
        .flat_map(|s| core.step(trigger(s)).commands)
        .flat_map(|c| match c {
            CoreCommand::DispatchStages(s) => s,
            CoreCommand::RequestExit => vec![],
        })
        .map(|s| s.run_id)
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[derive(Debug, Clone)]
enum Op {
    Trigger(usize),
    CompleteOne,
}

fn op_strategy(stages: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..stages).prop_map(Op::Trigger),
        Just(Op::CompleteOne),
    ]
}

proptest! {
    /// Whatever the interleaving of triggers and completions:
    /// - a stage never has two runs in flight,
    /// - every trigger is followed by a run that starts after it,
    /// - draining completions always reaches idle.
    #[test]
    fn stage_lock_never_overlaps_and_never_drops_changes(
        ops in proptest::collection::vec(op_strategy(3), 1..60)
    ) {
        let names = ["fonts", "images", "styles"];
        let mut core = new_core(&names, false);
        // Runs currently in flight, in dispatch order.
        let mut in_flight: Vec<String> = Vec::new();
        // Stages triggered since their last dispatch.
        let mut unserved: Vec<String> = Vec::new();

        let apply = |core: &mut CoreRuntime, event: RuntimeEvent,
                         in_flight: &mut Vec<String>, unserved: &mut Vec<String>| {
            let step = core.step(event);
            for name in dispatched(&step.commands) {
                prop_assert!(!in_flight.contains(&name), "{} dispatched twice", name);
                unserved.retain(|s| *s != name);
                in_flight.push(name);
            }
            Ok(())
        };

        for op in ops {
            match op {
                Op::Trigger(i) => {
                    let name = names[i].to_string();
                    if !unserved.contains(&name) {
                        unserved.push(name.clone());
                    }
                    apply(&mut core, trigger(&name), &mut in_flight, &mut unserved)?;
                }
                Op::CompleteOne => {
                    if in_flight.is_empty() {
                        continue;
                    }
                    let name = in_flight.remove(0);
                    apply(&mut core, complete(&name, ok()), &mut in_flight, &mut unserved)?;
                }
            }
        }

        let mut guard = 0;
        while !in_flight.is_empty() {
            let name = in_flight.remove(0);
            apply(&mut core, complete(&name, ok()), &mut in_flight, &mut unserved)?;
            guard += 1;
            prop_assert!(guard < 100, "completions never drained");
        }

        prop_assert!(core.is_idle());
        prop_assert!(unserved.is_empty(), "triggers never served: {:?}", unserved);
    }
}
