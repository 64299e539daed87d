//! Entity-bound scheduling: synchronous rejection, retirement before firing,
//! and context affinity, across host profiles.

mod common;

use common::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tickplex::host::Retired;
use tickplex::lab::LabContext;
use tickplex::{ExecutionState, LabConfig, LabEntity, LabHost, RegionKey, Task};

fn init_test(name: &str) {
    init_test_logging();
    tickplex::test_phase!(name);
}

fn profiles() -> [(&'static str, LabConfig); 3] {
    [
        ("spigot", LabConfig::spigot_like()),
        ("paper", LabConfig::paper_like()),
        ("folia", LabConfig::folia_like()),
    ]
}

fn counting(counter: &Arc<AtomicUsize>) -> Option<Retired> {
    let counter = Arc::clone(counter);
    Some(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }))
}

#[test]
fn each_task_either_runs_or_retires_exactly_once() {
    init_test("each_task_either_runs_or_retires_exactly_once");
    for (profile, config) in profiles() {
        tickplex::test_section!(profile);
        let (host, platform) = lab_platform(config);
        let scheduler = platform.entity_scheduler();
        let mut rng = shuffle_rng();

        struct Tracked {
            entity: Arc<LabEntity>,
            ran: Arc<AtomicUsize>,
            retired: Arc<AtomicUsize>,
            removed: bool,
        }

        let mut tracked: Vec<Tracked> = (0..40)
            .map(|i| Tracked {
                entity: Arc::new(LabEntity::new(
                    format!("mob-{i}"),
                    Some(RegionKey::new(test_world(), i % 5, 0)),
                )),
                ran: Arc::new(AtomicUsize::new(0)),
                retired: Arc::new(AtomicUsize::new(0)),
                removed: false,
            })
            .collect();

        let mut tasks = Vec::new();
        for t in &tracked {
            let ran = Arc::clone(&t.ran);
            let task = scheduler
                .execute_delayed(
                    t.entity.clone(),
                    counting(&t.retired),
                    move || {
                        ran.fetch_add(1, Ordering::SeqCst);
                    },
                    rng.u64(1..=4),
                )
                .expect("submit")
                .expect("entity alive at submit");
            tasks.push(task);
        }

        rng.shuffle(&mut tracked[..]);
        for t in tracked.iter_mut().take(15) {
            t.entity.remove();
            t.removed = true;
        }
        host.run_ticks(5);

        for t in &tracked {
            let ran = t.ran.load(Ordering::SeqCst);
            let retired = t.retired.load(Ordering::SeqCst);
            let expected = if t.removed { (0, 1) } else { (1, 0) };
            tickplex::assert_with_log!(
                (ran, retired) == expected,
                "ran xor retired",
                expected,
                (ran, retired)
            );
        }
        let settled = tasks.iter().all(|t| {
            matches!(
                t.execution_state(),
                ExecutionState::Finished | ExecutionState::Cancelled
            ) && t.result().is_done()
        });
        tickplex::assert_with_log!(settled, "all tasks settled", true, settled);
        assert_eq!(host.pending(), 0);
    }
    tickplex::test_complete!("each_task_either_runs_or_retires_exactly_once");
}

#[test]
fn removed_entity_is_rejected_without_scheduling() {
    init_test("removed_entity_is_rejected_without_scheduling");
    for (profile, config) in profiles() {
        tickplex::test_section!(profile);
        let (host, platform) = lab_platform(config);
        let entity = Arc::new(LabEntity::new("gone", None));
        entity.remove();
        let retired = Arc::new(AtomicUsize::new(0));
        let scheduler = platform.entity_scheduler();

        let once = scheduler
            .run(entity.clone(), counting(&retired), |_| 1)
            .expect("no error");
        let repeating = scheduler
            .run_at_fixed_rate(entity, counting(&retired), |_| {}, 1, 1)
            .expect("no error");
        assert!(once.is_none());
        assert!(repeating.is_none());
        host.run_ticks(2);
        let retired = retired.load(Ordering::SeqCst);
        tickplex::assert_with_log!(retired == 0, "no callback on sync rejection", 0, retired);
        assert_eq!(host.pending(), 0);
    }
    tickplex::test_complete!("removed_entity_is_rejected_without_scheduling");
}

#[test]
fn entity_work_follows_the_entity_between_regions() {
    init_test("entity_work_follows_the_entity_between_regions");
    let (host, platform) = lab_platform(LabConfig::folia_like());
    let start = RegionKey::new(test_world(), 0, 0);
    let destination = RegionKey::new(test_world(), 8, -2);
    let entity = Arc::new(LabEntity::new("traveller", Some(start.clone())));
    let contexts = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen = Arc::clone(&contexts);
    let handle = platform
        .entity_scheduler()
        .run_at_fixed_rate(
            entity.clone(),
            None,
            move |_| seen.lock().push(LabHost::current_context()),
            1,
            1,
        )
        .expect("submit")
        .expect("alive");

    host.tick();
    entity.move_to(destination.clone());
    host.tick();
    handle.cancel();
    host.tick();

    let contexts = contexts.lock().clone();
    let expected = vec![
        Some(LabContext::Region(start)),
        Some(LabContext::Region(destination)),
    ];
    tickplex::assert_with_log!(contexts == expected, "followed entity", expected, contexts);
    tickplex::test_complete!("entity_work_follows_the_entity_between_regions");
}

#[test]
fn emulated_entities_run_on_the_global_context() {
    init_test("emulated_entities_run_on_the_global_context");
    let (host, platform) = lab_platform(LabConfig::spigot_like());
    let entity = Arc::new(LabEntity::new(
        "cow",
        Some(RegionKey::new(test_world(), 1, 1)),
    ));
    let task = platform
        .entity_scheduler()
        .run(entity, None, |task| {
            assert!(!task.is_async());
            LabHost::current_context()
        })
        .expect("submit")
        .expect("alive");
    host.tick();
    let context = task.result().try_get().and_then(Result::ok);
    tickplex::assert_with_log!(
        context == Some(Some(LabContext::Global)),
        "global context",
        Some(Some(LabContext::Global)),
        context
    );
    tickplex::test_complete!("emulated_entities_run_on_the_global_context");
}
