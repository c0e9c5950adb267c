//! Commit pipeline tests: publishing, observers, state updates, contention
//! and reconciliation of stale candidate trees.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use fabric_core::ReconcileConfig;
use fabric_runtime::{
    CommitError, CommitOptions, CommitStatus, ShadowTree, ShadowTreeRevision, StateUpdate,
    StateUpdateError,
};
use fabric_tree::{
    ComponentHandle, Props, ShadowNode, ShadowNodeFamily, ShadowNodeFragment, SharedShadowNode,
    State, StateData, Tag,
};

// ── Helpers ─────────────────────────────────────────────────────────────

fn family(tag: Tag) -> Arc<ShadowNodeFamily> {
    Arc::new(ShadowNodeFamily::new(tag, 1, ComponentHandle::new(1), "View"))
}

struct Fixture {
    tree: ShadowTree,
    root: Arc<ShadowNodeFamily>,
    leaves: Vec<Arc<ShadowNodeFamily>>,
}

/// Stateless root with `count` leaves, each holding an initial state.
fn fixture(count: usize, config: ReconcileConfig) -> Fixture {
    let root = family(0);
    let leaves: Vec<_> = (1..=count as Tag).map(family).collect();
    let children: Vec<SharedShadowNode> = leaves
        .iter()
        .map(|leaf| {
            Arc::new(ShadowNode::new(
                Arc::clone(leaf),
                ShadowNodeFragment::new()
                    .with_state(Arc::new(State::initial(StateData::new(0u32)))),
            ))
        })
        .collect();
    let tree = ShadowTree::new(
        1,
        ShadowNode::new(
            Arc::clone(&root),
            ShadowNodeFragment::new().with_children(children),
        ),
        config,
    );
    Fixture { tree, root, leaves }
}

fn restyle(root: &SharedShadowNode) -> Option<ShadowNode> {
    Some(root.clone_with(ShadowNodeFragment::new().with_props(Props::new("restyled"))))
}

fn leaf_value(root: &ShadowNode, index: usize) -> u32 {
    *root.children()[index]
        .state()
        .and_then(|state| state.data::<u32>())
        .expect("leaves hold u32 state")
}

// ═════════════════════════════════════════════════════════════════════════
// Publishing
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn new_tree_starts_at_revision_zero() {
    let f = fixture(2, ReconcileConfig::default());
    let current = f.tree.current_revision();
    assert_eq!(current.number, 0);
    assert_eq!(current.root.children().len(), 2);
    assert_eq!(f.tree.surface_id(), 1);
}

#[test]
fn commit_publishes_next_revision_and_notifies_observers() {
    let f = fixture(1, ReconcileConfig::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    f.tree.add_observer(Arc::new(
        move |old: &ShadowTreeRevision, new: &ShadowTreeRevision| {
            sink.lock().unwrap().push((old.number, new.number));
        },
    ));

    let first = f.tree.commit(restyle, CommitOptions::default()).unwrap();
    let second = f.tree.commit(restyle, CommitOptions::default()).unwrap();

    assert_eq!(first.number, 1);
    assert_eq!(second.number, 2);
    assert!(Arc::ptr_eq(&f.tree.current_revision().root, &second.root));
    assert_eq!(*seen.lock().unwrap(), vec![(0, 1), (1, 2)]);
}

#[test]
fn observers_see_revisions_in_commit_order_while_busy() {
    let f = fixture(1, ReconcileConfig::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);

    let sink = Arc::clone(&seen);
    f.tree.add_observer(Arc::new(
        move |_: &ShadowTreeRevision, new: &ShadowTreeRevision| {
            if new.number == 1 {
                entered_tx.send(()).unwrap();
                release_rx.lock().unwrap().recv().unwrap();
            }
            sink.lock().unwrap().push(new.number);
        },
    ));

    std::thread::scope(|scope| {
        let first = scope.spawn(|| f.tree.commit(restyle, CommitOptions::default()).unwrap());
        entered_rx.recv().unwrap();

        // Published while the observer is still busy with revision 1.
        let second = f.tree.commit(restyle, CommitOptions::default()).unwrap();
        assert_eq!(second.number, 2);
        assert!(seen.lock().unwrap().is_empty());

        release_tx.send(()).unwrap();
        assert_eq!(first.join().unwrap().number, 1);
    });

    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

#[test]
fn observer_may_commit_from_its_callback() {
    let f = Arc::new(fixture(1, ReconcileConfig::default()));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    let tree = Arc::downgrade(&f);
    f.tree.add_observer(Arc::new(
        move |_: &ShadowTreeRevision, new: &ShadowTreeRevision| {
            sink.lock().unwrap().push(new.number);
            if new.number == 1
                && let Some(f) = tree.upgrade()
            {
                f.tree.commit(restyle, CommitOptions::default()).unwrap();
            }
        },
    ));

    f.tree.commit(restyle, CommitOptions::default()).unwrap();
    assert_eq!(f.tree.current_revision().number, 2);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

#[test]
fn cancelled_transaction_publishes_nothing() {
    let f = fixture(1, ReconcileConfig::default());
    assert_eq!(
        f.tree.try_commit(|_| None, CommitOptions::default()),
        CommitStatus::Cancelled
    );
    assert_eq!(
        f.tree.commit(|_| None, CommitOptions::default()).unwrap_err(),
        CommitError::Cancelled
    );
    assert_eq!(f.tree.current_revision().number, 0);
}

// ═════════════════════════════════════════════════════════════════════════
// State updates
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn state_update_clones_the_spine_and_shares_siblings() {
    let f = fixture(3, ReconcileConfig::default());
    let before = f.tree.current_revision();

    let after = f
        .tree
        .update_state(&StateUpdate::new(Arc::clone(&f.leaves[1]), StateData::new(7u32)))
        .unwrap();

    assert_eq!(after.number, 1);
    assert_eq!(leaf_value(&after.root, 1), 7);
    assert_eq!(after.root.children()[1].state_revision(), 2);
    assert!(Arc::ptr_eq(&after.root.children()[0], &before.root.children()[0]));
    assert!(Arc::ptr_eq(&after.root.children()[2], &before.root.children()[2]));
    assert!(after.root.state_revision() > before.root.state_revision());
    assert_eq!(f.leaves[1].most_recent_revision(), Some(2));
    assert_eq!(f.root.most_recent_revision(), Some(after.root.state_revision()));
}

#[test]
fn state_update_for_unmounted_family_is_rejected() {
    let f = fixture(1, ReconcileConfig::default());
    let stranger = family(99);
    let err = f
        .tree
        .update_state(&StateUpdate::new(stranger, StateData::new(1u32)))
        .unwrap_err();
    assert_eq!(err, StateUpdateError::FamilyNotMounted { tag: 99 });
}

// ═════════════════════════════════════════════════════════════════════════
// Reconciliation of stale candidates
// ═════════════════════════════════════════════════════════════════════════

/// Build a candidate from `snapshot` that only touches leaf 1's props.
fn candidate_from(
    snapshot: &SharedShadowNode,
    touched: &ShadowNodeFamily,
) -> Option<ShadowNode> {
    snapshot.clone_tree(touched, |node| {
        node.clone_with(ShadowNodeFragment::new().with_props(Props::new("from snapshot")))
    })
}

#[test]
fn stale_candidate_keeps_state_committed_meanwhile() {
    let f = fixture(2, ReconcileConfig::default());
    let snapshot = f.tree.current_revision().root;
    f.tree
        .update_state(&StateUpdate::new(Arc::clone(&f.leaves[0]), StateData::new(5u32)))
        .unwrap();

    let published = f
        .tree
        .commit(
            |_| candidate_from(&snapshot, &f.leaves[1]),
            CommitOptions::default(),
        )
        .unwrap();

    assert_eq!(published.number, 2);
    assert_eq!(leaf_value(&published.root, 0), 5);
    assert_eq!(
        published.root.children()[1].props().downcast_ref::<&str>(),
        Some(&"from snapshot")
    );
}

#[test]
fn stale_candidate_without_reconciliation_rolls_state_back() {
    let f = fixture(2, ReconcileConfig::default());
    let snapshot = f.tree.current_revision().root;
    f.tree
        .update_state(&StateUpdate::new(Arc::clone(&f.leaves[0]), StateData::new(5u32)))
        .unwrap();

    let published = f
        .tree
        .commit(
            |_| candidate_from(&snapshot, &f.leaves[1]),
            CommitOptions::default().with_state_reconciliation(false),
        )
        .unwrap();

    assert_eq!(leaf_value(&published.root, 0), 0);
    // The family still remembers the newer state.
    assert_eq!(f.leaves[0].most_recent_revision(), Some(2));
}

#[test]
fn config_can_disable_reconciliation() {
    let config = ReconcileConfig::default().with_state_reconciliation(false);
    let f = fixture(2, config);
    assert!(!f.tree.commit_options().enable_state_reconciliation);

    let snapshot = f.tree.current_revision().root;
    f.tree
        .update_state(&StateUpdate::new(Arc::clone(&f.leaves[0]), StateData::new(5u32)))
        .unwrap();
    let published = f
        .tree
        .commit(
            |_| candidate_from(&snapshot, &f.leaves[1]),
            f.tree.commit_options(),
        )
        .unwrap();
    assert_eq!(leaf_value(&published.root, 0), 0);
}

#[test]
fn later_state_update_after_reconciled_commit_builds_on_newest_state() {
    let f = fixture(1, ReconcileConfig::default());
    let snapshot = f.tree.current_revision().root;
    f.tree
        .update_state(&StateUpdate::new(Arc::clone(&f.leaves[0]), StateData::new(1u32)))
        .unwrap();
    f.tree
        .commit(|_| restyle(&snapshot), CommitOptions::default())
        .unwrap();

    let after = f
        .tree
        .update_state(&StateUpdate::new(Arc::clone(&f.leaves[0]), StateData::new(2u32)))
        .unwrap();
    assert_eq!(leaf_value(&after.root, 0), 2);
    assert_eq!(after.root.children()[0].state_revision(), 3);
}

// ═════════════════════════════════════════════════════════════════════════
// Contention
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn try_commit_fails_when_another_commit_lands_first() {
    let f = fixture(1, ReconcileConfig::default());
    let status = f.tree.try_commit(
        |root| {
            assert_eq!(
                f.tree.try_commit(restyle, CommitOptions::default()),
                CommitStatus::Succeeded
            );
            restyle(root)
        },
        CommitOptions::default(),
    );
    assert_eq!(status, CommitStatus::Failed);
    assert_eq!(f.tree.current_revision().number, 1);

    assert_eq!(
        f.tree.try_commit(restyle, CommitOptions::default()),
        CommitStatus::Succeeded
    );
    assert_eq!(f.tree.current_revision().number, 2);
}

#[test]
fn commit_gives_up_after_max_attempts() {
    let f = fixture(1, ReconcileConfig::default().with_max_commit_attempts(3));
    let err = f
        .tree
        .commit(
            |root| {
                f.tree.commit(restyle, CommitOptions::default()).unwrap();
                restyle(root)
            },
            CommitOptions::default(),
        )
        .unwrap_err();
    assert_eq!(err, CommitError::Contention { attempts: 3 });
    assert_eq!(f.tree.current_revision().number, 3);
}

#[test]
fn concurrent_state_updates_all_land() {
    const THREADS: usize = 4;
    const UPDATES: u32 = 25;

    let f = fixture(
        THREADS,
        ReconcileConfig::default().with_max_commit_attempts(100_000),
    );
    std::thread::scope(|scope| {
        for leaf in &f.leaves {
            let tree = &f.tree;
            scope.spawn(move || {
                for value in 1..=UPDATES {
                    tree.update_state(&StateUpdate::new(Arc::clone(leaf), StateData::new(value)))
                        .unwrap();
                }
            });
        }
    });

    let current = f.tree.current_revision();
    assert_eq!(current.number, THREADS as u64 * u64::from(UPDATES));
    for index in 0..THREADS {
        assert_eq!(leaf_value(&current.root, index), UPDATES);
        assert_eq!(
            current.root.children()[index].state_revision(),
            u64::from(UPDATES) + 1
        );
    }
}
