//! Unit tests for filtering, dispatch, deregistration and the journal.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant};

use arbor_types::{EventType, EventTypes, ItemPath, RepositoryError};
use chrono::Utc;

use crate::event::{Event, EventBundle, Origin, PendingEvent, SessionId};
use crate::filter::EventFilter;
use crate::hub::EventHub;
use crate::journal::{JournalStore, MemoryJournalStore};
use crate::listener::{listener_fn, same_listener, EventListener};
use crate::manager::{LocalObservationManager, ObservationManager};
use crate::store::SqliteJournalStore;

const WAIT: Duration = Duration::from_secs(5);

fn path(p: &str) -> ItemPath {
    ItemPath::parse(p).expect("valid test path")
}

fn event_at(event_type: EventType, p: &str) -> Event {
    Event {
        event_type,
        path: path(p),
        identifier: None,
        parent_identifier: Some("parent-id".to_string()),
        parent_node_types: vec!["nt:folder".to_string(), "mix:referenceable".to_string()],
        user_id: "admin".to_string(),
        session_id: SessionId::new(),
        user_data: None,
        date: Utc::now(),
        info: Default::default(),
    }
}

fn added(p: &str) -> PendingEvent {
    PendingEvent::new(EventType::NodeAdded, path(p))
}

/// A listener forwarding every delivered batch over a channel.
fn recording_listener() -> (Arc<dyn EventListener>, Receiver<Vec<Event>>) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let listener = listener_fn(move |events| {
        let batch: Vec<Event> = events.collect();
        let _ = tx.lock().expect("sender lock").send(batch);
    });
    (listener, rx)
}

fn manager(hub: &EventHub) -> LocalObservationManager {
    LocalObservationManager::new(hub.clone(), SessionId::new(), "admin")
        .expect("manager should start")
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn listener_count(m: &LocalObservationManager) -> usize {
    m.registered_event_listeners()
        .expect("listing should succeed")
        .size()
}

// ── Filter semantics ─────────────────────────────────────────────────

#[test]
fn shallow_path_matches_only_direct_children() {
    let filter = EventFilter::all().path(path("/a"), false);
    let observer = SessionId::new();

    assert!(filter.matches(&event_at(EventType::NodeAdded, "/a/b"), observer));
    assert!(!filter.matches(&event_at(EventType::NodeAdded, "/a/b/c"), observer));
    assert!(!filter.matches(&event_at(EventType::NodeAdded, "/a"), observer));
}

#[test]
fn deep_path_matches_whole_subgraph() {
    let filter = EventFilter::all().path(path("/a"), true);
    let observer = SessionId::new();

    assert!(filter.matches(&event_at(EventType::NodeAdded, "/a/b"), observer));
    assert!(filter.matches(&event_at(EventType::NodeAdded, "/a/b/c/d"), observer));
    assert!(!filter.matches(&event_at(EventType::NodeAdded, "/ab/c"), observer));
    assert!(!filter.matches(&event_at(EventType::NodeAdded, "/a"), observer));
}

#[test]
fn property_events_match_on_owning_node() {
    let filter = EventFilter::all().path(path("/a/b"), false);
    let observer = SessionId::new();

    assert!(filter.matches(&event_at(EventType::PropertyChanged, "/a/b/title"), observer));
    assert!(!filter.matches(&event_at(EventType::PropertyChanged, "/a/title"), observer));
}

#[test]
fn unset_and_empty_identifier_lists_differ() {
    let observer = SessionId::new();
    let event = event_at(EventType::NodeAdded, "/a/b");

    let unset = EventFilter::all();
    let empty = EventFilter::all().identifiers(Vec::<String>::new());
    let listed = EventFilter::all().identifiers(["parent-id"]);
    let other = EventFilter::all().identifiers(["someone-else"]);

    assert!(unset.identifiers.is_none());
    assert!(unset.matches(&event, observer));
    assert!(!empty.matches(&event, observer));
    assert!(listed.matches(&event, observer));
    assert!(!other.matches(&event, observer));
}

#[test]
fn unset_and_empty_node_type_lists_differ() {
    let observer = SessionId::new();
    let event = event_at(EventType::NodeAdded, "/a/b");

    assert!(EventFilter::all().matches(&event, observer));
    assert!(!EventFilter::all()
        .node_type_names(Vec::<String>::new())
        .matches(&event, observer));
    assert!(EventFilter::all()
        .node_type_names(["mix:referenceable"])
        .matches(&event, observer));
    assert!(!EventFilter::all()
        .node_type_names(["nt:file"])
        .matches(&event, observer));
}

#[test]
fn restrictions_are_combined_with_and() {
    let observer = SessionId::new();
    let event = event_at(EventType::NodeAdded, "/a/b");

    let filter = EventFilter::all()
        .event_types(EventType::NodeAdded)
        .path(path("/a"), false)
        .identifiers(["parent-id"])
        .node_type_names(["nt:folder"]);
    assert!(filter.matches(&event, observer));

    let wrong_type = filter.clone().event_types(EventType::NodeRemoved);
    assert!(!wrong_type.matches(&event, observer));

    let wrong_path = filter.clone().path(path("/z"), true);
    assert!(!wrong_path.matches(&event, observer));
}

#[test]
fn no_local_drops_own_events_only() {
    let event = event_at(EventType::NodeAdded, "/a");
    let filter = EventFilter::all().no_local(true);

    assert!(!filter.matches(&event, event.session_id));
    assert!(filter.matches(&event, SessionId::new()));
}

#[test]
fn persist_marker_has_no_associated_node() {
    let observer = SessionId::new();
    let mut persist = event_at(EventType::Persist, "/");
    persist.parent_identifier = None;
    persist.parent_node_types.clear();

    let by_path = EventFilter::all().path(path("/deep/below"), false);
    assert!(by_path.matches(&persist, observer));
    assert!(!by_path
        .clone()
        .event_types(EventType::NodeAdded)
        .matches(&persist, observer));

    assert!(!EventFilter::all()
        .identifiers(["parent-id"])
        .matches(&persist, observer));
    assert!(!EventFilter::all()
        .node_type_names(["nt:folder"])
        .matches(&persist, observer));
}

#[test]
fn empty_event_mask_is_rejected() {
    let filter = EventFilter::all().event_types(EventTypes::NONE);
    assert!(matches!(
        filter.validate(),
        Err(RepositoryError::InvalidFilter(_))
    ));
}

// ── Bundles ──────────────────────────────────────────────────────────

#[test]
fn stamped_bundle_ends_with_persist_marker() {
    let session_id = SessionId::new();
    let bundle = EventBundle::stamp(
        vec![added("/a"), PendingEvent::moved(&path("/a"), path("/b"))],
        Origin {
            session_id,
            user_id: "editor".to_string(),
            user_data: Some("import".to_string()),
            date: Utc::now(),
        },
    );

    let types: Vec<EventType> = bundle.events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![EventType::NodeAdded, EventType::NodeMoved, EventType::Persist]
    );
    assert!(bundle.events.iter().all(|e| e.session_id == session_id));
    assert!(bundle
        .events
        .iter()
        .all(|e| e.user_data.as_deref() == Some("import")));
    assert_eq!(
        bundle.events[1].info.get("srcAbsPath").map(String::as_str),
        Some("/a")
    );
}

// ── Registration ─────────────────────────────────────────────────────

#[test]
fn registered_listener_is_listed_once() {
    let hub = EventHub::new();
    let m = manager(&hub);
    let (listener, _rx) = recording_listener();

    assert_eq!(listener_count(&m), 0);

    m.add_event_listener(Arc::clone(&listener), EventFilter::all())
        .expect("add should succeed");
    m.add_event_listener(
        Arc::clone(&listener),
        EventFilter::all().event_types(EventType::NodeRemoved),
    )
    .expect("re-add should succeed");

    let listed: Vec<_> = m.registered_event_listeners().unwrap().collect();
    assert_eq!(listed.len(), 1);
    assert!(same_listener(&listed[0], &listener));
}

#[test]
fn listener_receives_matching_events_in_order() {
    let hub = EventHub::new();
    let m = manager(&hub);
    let (listener, rx) = recording_listener();

    m.add_event_listener(
        listener,
        EventFilter::all()
            .event_types(EventType::NodeAdded)
            .path(path("/content"), true),
    )
    .unwrap();

    m.emit(vec![added("/content/a"), added("/other/b"), added("/content/a/c")])
        .unwrap();

    let batch = rx.recv_timeout(WAIT).expect("listener should be called");
    let paths: Vec<&str> = batch.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["/content/a", "/content/a/c"]);
}

#[test]
fn bundle_without_matches_does_not_invoke_listener() {
    let hub = EventHub::new();
    let m = manager(&hub);
    let (listener, rx) = recording_listener();

    m.add_event_listener(
        listener,
        EventFilter::all()
            .event_types(EventType::NodeAdded)
            .path(path("/watched"), true),
    )
    .unwrap();

    m.emit(vec![added("/elsewhere/a")]).unwrap();
    m.emit(vec![added("/watched/b")]).unwrap();

    let batch = rx.recv_timeout(WAIT).expect("listener should be called");
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].path.as_str(), "/watched/b");
}

#[test]
fn re_registration_loses_no_events() {
    const BUNDLES: usize = 200;

    let hub = EventHub::new();
    let m = Arc::new(manager(&hub));
    let (listener, rx) = recording_listener();

    let narrow = EventFilter::all()
        .event_types(EventType::NodeAdded)
        .path(path("/a"), false);
    let wide = EventFilter::all()
        .event_types(EventType::NodeAdded | EventType::NodeRemoved)
        .path(path("/a"), true);

    m.add_event_listener(Arc::clone(&listener), narrow.clone())
        .unwrap();

    let emitter = {
        let m = Arc::clone(&m);
        thread::spawn(move || {
            for i in 0..BUNDLES {
                m.emit(vec![added(&format!("/a/n{i}"))]).unwrap();
            }
        })
    };
    for i in 0..BUNDLES {
        let filter = if i % 2 == 0 { wide.clone() } else { narrow.clone() };
        m.add_event_listener(Arc::clone(&listener), filter).unwrap();
    }
    emitter.join().expect("emitter should not panic");

    let mut seen = Vec::new();
    while seen.len() < BUNDLES {
        let batch = rx.recv_timeout(WAIT).expect("every bundle should arrive");
        seen.extend(batch.into_iter().map(|e| e.path.to_string()));
    }
    assert_eq!(seen.len(), BUNDLES, "no event duplicated");
    for (i, p) in seen.iter().enumerate() {
        assert_eq!(p, &format!("/a/n{i}"));
    }
}

#[test]
fn bundle_is_evaluated_against_one_filter_version() {
    const BUNDLES: usize = 200;

    let hub = EventHub::new();
    let m = Arc::new(manager(&hub));
    let (listener, rx) = recording_listener();

    let nodes = EventFilter::all().event_types(EventType::NodeAdded);
    let props = EventFilter::all().event_types(EventType::PropertyAdded);
    m.add_event_listener(Arc::clone(&listener), nodes.clone())
        .unwrap();

    let emitter = {
        let m = Arc::clone(&m);
        thread::spawn(move || {
            for i in 0..BUNDLES {
                m.emit(vec![
                    added(&format!("/n{i}")),
                    PendingEvent::new(EventType::PropertyAdded, path(&format!("/n{i}/p"))),
                ])
                .unwrap();
            }
        })
    };
    for i in 0..BUNDLES {
        let filter = if i % 2 == 0 { props.clone() } else { nodes.clone() };
        m.add_event_listener(Arc::clone(&listener), filter).unwrap();
    }
    emitter.join().expect("emitter should not panic");

    let mut batches = 0;
    while batches < BUNDLES {
        let batch = rx.recv_timeout(WAIT).expect("every bundle should be delivered");
        assert_eq!(batch.len(), 1, "a bundle must never mix two filter versions");
        batches += 1;
    }
}

// ── Deregistration ───────────────────────────────────────────────────

#[test]
fn removing_unregistered_listener_is_a_no_op() {
    let hub = EventHub::new();
    let m = manager(&hub);
    let (listener, _rx) = recording_listener();

    m.remove_event_listener(&listener)
        .expect("removing an unknown listener should succeed");

    m.add_event_listener(Arc::clone(&listener), EventFilter::all())
        .unwrap();
    m.remove_event_listener(&listener).unwrap();
    m.remove_event_listener(&listener)
        .expect("second removal should succeed");
    assert_eq!(listener_count(&m), 0);
}

#[test]
fn removed_listener_receives_nothing_more() {
    let hub = EventHub::new();
    let m = manager(&hub);
    let (listener, rx) = recording_listener();
    let (witness, witness_rx) = recording_listener();

    m.add_event_listener(Arc::clone(&listener), EventFilter::all())
        .unwrap();
    m.add_event_listener(witness, EventFilter::all()).unwrap();
    m.remove_event_listener(&listener).unwrap();

    m.emit(vec![added("/a")]).unwrap();
    witness_rx
        .recv_timeout(WAIT)
        .expect("witness should see the bundle");
    assert!(rx.try_recv().is_err(), "removed listener must not be called");
}

#[test]
fn external_removal_waits_for_running_callback() {
    let hub = EventHub::new();
    let m = Arc::new(manager(&hub));

    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let finished = Arc::new(AtomicBool::new(false));

    let entered_tx = Mutex::new(entered_tx);
    let release_rx = Mutex::new(release_rx);
    let done = Arc::clone(&finished);
    let listener = listener_fn(move |_events| {
        let _ = entered_tx.lock().unwrap().send(());
        let _ = release_rx.lock().unwrap().recv_timeout(WAIT);
        done.store(true, Ordering::SeqCst);
    });

    m.add_event_listener(Arc::clone(&listener), EventFilter::all())
        .unwrap();
    m.emit(vec![added("/a")]).unwrap();
    entered_rx
        .recv_timeout(WAIT)
        .expect("callback should start");

    let (removed_tx, removed_rx) = mpsc::channel::<bool>();
    let remover = {
        let m = Arc::clone(&m);
        let listener = Arc::clone(&listener);
        let finished = Arc::clone(&finished);
        thread::spawn(move || {
            m.remove_event_listener(&listener).unwrap();
            let _ = removed_tx.send(finished.load(Ordering::SeqCst));
        })
    };

    assert!(
        removed_rx.recv_timeout(Duration::from_millis(200)).is_err(),
        "removal must block while the callback runs"
    );

    release_tx.send(()).unwrap();
    let callback_done = removed_rx
        .recv_timeout(WAIT)
        .expect("removal should return once the callback finishes");
    assert!(callback_done, "removal returned before the callback finished");
    remover.join().unwrap();

    assert_eq!(listener_count(&m), 0);
}

#[test]
fn self_removal_from_callback_is_deferred() {
    let hub = EventHub::new();
    let m = Arc::new(manager(&hub));

    let weak_manager: Weak<LocalObservationManager> = Arc::downgrade(&m);
    let me: Arc<OnceLock<Arc<dyn EventListener>>> = Arc::new(OnceLock::new());
    let (report_tx, report_rx) = mpsc::channel::<usize>();
    let calls = Arc::new(AtomicUsize::new(0));

    let listener = {
        let me = Arc::clone(&me);
        let report_tx = Mutex::new(report_tx);
        let calls = Arc::clone(&calls);
        listener_fn(move |_events| {
            calls.fetch_add(1, Ordering::SeqCst);
            let (Some(m), Some(me)) = (weak_manager.upgrade(), me.get()) else {
                return;
            };
            m.remove_event_listener(me).expect("self-removal should succeed");
            let still_listed = m.registered_event_listeners().unwrap().size();
            let _ = report_tx.lock().unwrap().send(still_listed);
        })
    };
    me.set(Arc::clone(&listener))
        .unwrap_or_else(|_| panic!("listener handle set twice"));

    m.add_event_listener(listener, EventFilter::all()).unwrap();
    m.emit(vec![added("/a")]).unwrap();

    let listed_during_callback = report_rx
        .recv_timeout(WAIT)
        .expect("self-removal must not deadlock");
    assert_eq!(listed_during_callback, 1, "listener stays listed until its callback returns");

    assert!(wait_until(|| listener_count(&m) == 0));

    m.emit(vec![added("/b")]).unwrap();
    let (witness, witness_rx) = recording_listener();
    m.add_event_listener(witness, EventFilter::all()).unwrap();
    m.emit(vec![added("/c")]).unwrap();
    witness_rx.recv_timeout(WAIT).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn panicking_listener_does_not_stop_dispatch() {
    let hub = EventHub::new();
    let m = manager(&hub);
    let (witness, rx) = recording_listener();

    m.add_event_listener(
        listener_fn(|_events| panic!("listener failure")),
        EventFilter::all(),
    )
    .unwrap();
    m.add_event_listener(witness, EventFilter::all()).unwrap();

    m.emit(vec![added("/a")]).unwrap();
    m.emit(vec![added("/b")]).unwrap();

    assert_eq!(rx.recv_timeout(WAIT).unwrap()[0].path.as_str(), "/a");
    assert_eq!(rx.recv_timeout(WAIT).unwrap()[0].path.as_str(), "/b");
}

// ── Sessions ─────────────────────────────────────────────────────────

#[test]
fn no_local_listener_ignores_own_session() {
    let hub = EventHub::new();
    let watcher = manager(&hub);
    let writer = manager(&hub);
    let (listener, rx) = recording_listener();

    watcher
        .add_event_listener(
            listener,
            EventFilter::all()
                .event_types(EventType::NodeAdded)
                .no_local(true),
        )
        .unwrap();

    watcher.emit(vec![added("/mine")]).unwrap();
    writer.emit(vec![added("/theirs")]).unwrap();

    let batch = rx.recv_timeout(WAIT).expect("foreign event should arrive");
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].path.as_str(), "/theirs");
    assert_eq!(batch[0].session_id, writer.session_id());
}

#[test]
fn user_data_applies_to_subsequent_events() {
    let hub = EventHub::with_journal(Arc::new(MemoryJournalStore::new()));
    let m = manager(&hub);

    m.emit(vec![added("/before")]).unwrap();
    m.set_user_data(Some("import-42".to_string())).unwrap();
    m.emit(vec![added("/during")]).unwrap();
    m.set_user_data(Some("import-43".to_string())).unwrap();
    m.emit(vec![added("/overwritten")]).unwrap();
    m.set_user_data(None).unwrap();
    m.emit(vec![added("/after")]).unwrap();

    let journal = m
        .event_journal(&EventFilter::all().event_types(EventType::NodeAdded))
        .unwrap()
        .expect("journal is supported");
    let data: Vec<Option<String>> = journal.map(|e| e.user_data).collect();
    assert_eq!(
        data,
        vec![
            None,
            Some("import-42".to_string()),
            Some("import-43".to_string()),
            None
        ]
    );
}

#[test]
fn closed_manager_rejects_operations() {
    let hub = EventHub::new();
    let m = manager(&hub);
    let (listener, _rx) = recording_listener();
    m.add_event_listener(Arc::clone(&listener), EventFilter::all())
        .unwrap();
    assert_eq!(hub.subscriber_count(), 1);

    m.close();

    assert!(m.is_closed());
    assert_eq!(listener_count(&m), 0);
    assert_eq!(hub.subscriber_count(), 0);
    assert!(matches!(
        m.add_event_listener(listener, EventFilter::all()),
        Err(RepositoryError::Closed(_))
    ));
    assert!(matches!(
        m.emit(vec![added("/a")]),
        Err(RepositoryError::Closed(_))
    ));
}

#[test]
fn invalid_filter_is_rejected_on_registration() {
    let hub = EventHub::new();
    let m = manager(&hub);
    let (listener, _rx) = recording_listener();

    let err = m
        .add_event_listener(listener, EventFilter::all().event_types(EventTypes::NONE))
        .expect_err("empty mask should be rejected");
    assert!(matches!(err, RepositoryError::InvalidFilter(_)));
    assert_eq!(listener_count(&m), 0);
}

// ── Journal ──────────────────────────────────────────────────────────

#[test]
fn journal_absent_is_distinct_from_empty() {
    let without = manager(&EventHub::new());
    assert!(without
        .event_journal(&EventFilter::all())
        .unwrap()
        .is_none());

    let with = manager(&EventHub::with_journal(Arc::new(MemoryJournalStore::new())));
    let journal = with
        .event_journal(&EventFilter::all())
        .unwrap()
        .expect("journal is supported");
    assert!(journal.is_empty());
    assert_eq!(journal.size(), 0);
}

#[test]
fn journal_applies_listener_filter_semantics() {
    let hub = EventHub::with_journal(Arc::new(MemoryJournalStore::new()));
    let m = manager(&hub);

    m.emit(vec![
        added("/content/a").parent_identifier("content-id"),
        added("/content/b").parent_identifier("content-id"),
        added("/other/c").parent_identifier("other-id"),
    ])
    .unwrap();

    let by_id = m
        .event_journal(&EventFilter::all().identifiers(["content-id"]))
        .unwrap()
        .unwrap();
    assert_eq!(by_id.size(), 2);

    let none = m
        .event_journal(&EventFilter::all().identifiers(Vec::<String>::new()))
        .unwrap()
        .unwrap();
    assert_eq!(none.size(), 0);

    let everything = m.event_journal(&EventFilter::all()).unwrap().unwrap();
    assert_eq!(everything.size(), 4, "three changes plus the persist marker");
}

#[test]
fn journal_skip_to_date() {
    let store = MemoryJournalStore::new();
    let observer = SessionId::new();
    let mut early = event_at(EventType::NodeAdded, "/early");
    early.date = Utc::now() - chrono::Duration::hours(2);
    let mut late = event_at(EventType::NodeAdded, "/late");
    late.date = Utc::now();

    store
        .append(&EventBundle {
            bundle_id: uuid::Uuid::new_v4(),
            events: vec![early, late.clone()],
        })
        .unwrap();

    let mut journal =
        crate::journal::EventJournal::new(store.read(&EventFilter::all(), observer).unwrap());
    journal.skip_to(Utc::now() - chrono::Duration::hours(1));
    assert_eq!(journal.position(), 1);
    assert_eq!(journal.next().map(|e| e.path), Some(late.path));
    assert_eq!(journal.next(), None);
}

#[test]
fn sqlite_journal_persists_bundles_in_order() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let db = dir.path().join("journal.db");
    let pool = arbor_db::open_journal_pool(
        db.to_str().expect("utf-8 temp path"),
        arbor_db::DbRuntimeSettings::default(),
    )
    .expect("journal pool should open");

    let hub = EventHub::with_journal(Arc::new(SqliteJournalStore::new(pool.clone())));
    let m = manager(&hub);

    m.set_user_data(Some("sqlite".to_string())).unwrap();
    m.emit(vec![
        added("/a").identifier("a-id").parent_identifier("root-id"),
        PendingEvent::new(EventType::PropertyChanged, path("/a/title"))
            .parent_identifier("a-id")
            .parent_node_types(["nt:unstructured"]),
    ])
    .unwrap();
    m.emit(vec![PendingEvent::new(EventType::NodeRemoved, path("/a"))])
        .unwrap();

    let all: Vec<Event> = m
        .event_journal(&EventFilter::all())
        .unwrap()
        .expect("journal is supported")
        .collect();
    let types: Vec<EventType> = all.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            EventType::NodeAdded,
            EventType::PropertyChanged,
            EventType::Persist,
            EventType::NodeRemoved,
            EventType::Persist
        ]
    );
    assert_eq!(all[1].parent_node_types, vec!["nt:unstructured".to_string()]);
    assert!(all.iter().all(|e| e.user_data.as_deref() == Some("sqlite")));

    let typed = SqliteJournalStore::new(pool)
        .read(
            &EventFilter::all().event_types(EventType::PropertyChanged | EventType::NodeRemoved),
            m.session_id(),
        )
        .unwrap();
    assert_eq!(typed.len(), 2);

    let local_only = m
        .event_journal(&EventFilter::all().no_local(true))
        .unwrap()
        .unwrap();
    assert!(local_only.is_empty());
}

/// A store that always fails, to check publication is all-or-nothing.
struct BrokenStore;

impl JournalStore for BrokenStore {
    fn append(&self, _bundle: &EventBundle) -> arbor_types::RepositoryResult<()> {
        Err(RepositoryError::Backend("disk full".to_string()))
    }

    fn read(
        &self,
        _filter: &EventFilter,
        _observer: SessionId,
    ) -> arbor_types::RepositoryResult<Vec<Event>> {
        Err(RepositoryError::Backend("disk full".to_string()))
    }
}

#[test]
fn journal_failure_blocks_live_delivery() {
    let hub = EventHub::with_journal(Arc::new(BrokenStore));
    let m = manager(&hub);
    let (listener, rx) = recording_listener();
    m.add_event_listener(listener, EventFilter::all()).unwrap();

    assert!(matches!(
        m.emit(vec![added("/a")]),
        Err(RepositoryError::Backend(_))
    ));
    assert!(matches!(
        m.event_journal(&EventFilter::all()),
        Err(RepositoryError::Backend(_))
    ));
    thread::sleep(Duration::from_millis(50));
    assert!(rx.try_recv().is_err());
}
