//! End-to-end behavior of the object layer through the public API.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use serde_json::{json, Value};

use liab_store::{
    Flake, FlakeConfig, ManualClock, Schema, Store, StoreConfig, StoreError, StoreResult, Txn, TypeDecl,
    WriteTxn,
};

fn zoo() -> Schema {
    Schema::new()
        .with_type("person", TypeDecl::new().bucket("pets", "cat"))
        .with_type("cat", TypeDecl::new().stream("meows"))
}

fn chat() -> Schema {
    Schema::new()
        .with_type("user", TypeDecl::new().bucket("rooms", "room"))
        .with_type("room", TypeDecl::new().bucket("users", "user").stream("events"))
}

fn tail_ids<T: Txn>(tx: &T, hash: &str) -> Vec<Flake> {
    tx.hash(hash)
        .unwrap()
        .tail()
        .map(|item| item.unwrap().id())
        .collect()
}

// ---------------------------------------------------------------------------
// Hash tails
// ---------------------------------------------------------------------------

#[test]
fn hash_tails_are_reverse_insertion_order() {
    let store = Store::in_memory(zoo()).unwrap();

    let (people, cats, seen) = store
        .write(|wx| -> StoreResult<_> {
            let mut people = Vec::new();
            for name in ["P1", "P2", "P3"] {
                people.push(wx.hash("person")?.insert(&json!({ "name": name }))?.id());
            }
            let mut cats = Vec::new();
            for name in ["C1", "C2"] {
                cats.push(wx.hash("cat")?.insert(&json!({ "name": name }))?.id());
            }
            let seen = (tail_ids(wx, "person"), tail_ids(wx, "cat"));
            Ok((people, cats, seen))
        })
        .unwrap();

    let want_people: Vec<Flake> = people.iter().rev().copied().collect();
    let want_cats: Vec<Flake> = cats.iter().rev().copied().collect();
    assert_eq!(seen.0, want_people);
    assert_eq!(seen.1, want_cats);

    let rx = store.rx().unwrap();
    assert_eq!(tail_ids(&rx, "person"), want_people);
    assert_eq!(tail_ids(&rx, "cat"), want_cats);

    let names: Vec<Value> = rx
        .hash("cat")
        .unwrap()
        .tail()
        .map(|item| item.unwrap().get::<Value>().unwrap().unwrap()["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("C2"), json!("C1")]);
}

#[test]
fn tails_ignore_nested_stream_entries() {
    let store = Store::in_memory(zoo()).unwrap();
    store
        .write(|wx| -> StoreResult<()> {
            let cat = wx.hash("cat")?.insert(&"tom")?;
            for _ in 0..3 {
                cat.stream("meows")?.append(&"meow")?;
            }
            Ok(())
        })
        .unwrap();

    let rx = store.rx().unwrap();
    assert_eq!(tail_ids(&rx, "cat").len(), 1);
    let cat = rx.hash("cat").unwrap().tail().next().unwrap().unwrap();
    assert_eq!(cat.stream("meows").unwrap().tail().count(), 3);
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

#[test]
fn buckets_link_both_ways() {
    let store = Store::in_memory(chat()).unwrap();

    let (user_id, room_id) = store
        .write(|wx| -> StoreResult<_> {
            let user = wx.hash("user")?.insert(&json!({"name": "ann"}))?;
            let room = wx.hash("room")?.insert(&json!({"topic": "rust"}))?;
            user.bucket("rooms")?.set(&room)?;
            room.bucket("users")?.set(&user)?;

            assert_eq!(user.bucket("rooms")?.get()?, vec![room.clone()]);
            assert_eq!(room.bucket("users")?.get()?, vec![user.clone()]);
            Ok((user.id(), room.id()))
        })
        .unwrap();

    store
        .read(|rx| -> StoreResult<()> {
            let user = rx.hash("user")?.get(user_id);
            let room = rx.hash("room")?.get(room_id);
            assert_eq!(user.bucket("rooms")?.get()?, vec![room.clone()]);
            assert_eq!(room.bucket("users")?.get()?, vec![user]);
            Ok(())
        })
        .unwrap();
}

// ---------------------------------------------------------------------------
// Schema errors
// ---------------------------------------------------------------------------

#[test]
fn undeclared_field_is_unknown() {
    let store = Store::in_memory(chat()).unwrap();
    let res: StoreResult<()> = store.write(|wx| {
        let user = wx.hash("user")?.insert(&1)?;
        user.bucket("friends")?;
        Ok(())
    });
    assert!(matches!(res, Err(StoreError::UnknownField { .. })));
}

#[test]
fn wrong_handle_kind_is_a_mismatch() {
    let store = Store::in_memory(chat()).unwrap();
    let res: StoreResult<()> = store.write(|wx| {
        let room = wx.hash("room")?.insert(&1)?;
        room.bucket("events")?;
        Ok(())
    });
    assert!(matches!(res, Err(StoreError::KindMismatch { .. })));
}

// ---------------------------------------------------------------------------
// Atomicity
// ---------------------------------------------------------------------------

#[test]
fn failed_write_leaves_no_trace() {
    let store = Store::in_memory(chat()).unwrap();
    let existing = store
        .write(|wx| wx.hash("user")?.insert(&"kept").map(|u| u.id()))
        .unwrap();

    let res: StoreResult<()> = store.write(|wx| {
        let user = wx.hash("user")?.get(existing);
        let room = wx.hash("room")?.insert(&"doomed")?;
        user.bucket("rooms")?.set(&room)?;
        room.stream("events")?.append(&"created")?;
        user.set(&"overwritten")?;
        Err(StoreError::Config("boom".into()))
    });
    assert!(res.is_err());

    store
        .read(|rx| -> StoreResult<()> {
            assert!(tail_ids(rx, "room").is_empty());
            let user = rx.hash("user")?.get(existing);
            assert_eq!(user.get::<String>()?, Some("kept".to_string()));
            assert!(user.bucket("rooms")?.get()?.is_empty());
            Ok(())
        })
        .unwrap();
}

#[test]
fn explicit_handles_commit_and_abort() {
    let store = Store::in_memory(chat()).unwrap();

    let wx = store.wx().unwrap();
    wx.hash("user").unwrap().insert(&"gone").unwrap();
    wx.abort().unwrap();
    assert!(tail_ids(&store.rx().unwrap(), "user").is_empty());

    let wx = store.wx().unwrap();
    let id = wx.hash("user").unwrap().insert(&"here").unwrap().id();
    wx.commit().unwrap();
    assert_eq!(tail_ids(&store.rx().unwrap(), "user"), vec![id]);
}

// ---------------------------------------------------------------------------
// Identifier generation under a simulated clock
// ---------------------------------------------------------------------------

#[test]
fn sequence_exhaustion_waits_one_millisecond() {
    let start = FlakeConfig::default().epoch_ms + 10_000;
    let clock = Arc::new(ManualClock::new(start));
    let store = Store::in_memory_with_clock(StoreConfig::default(), chat(), clock.clone()).unwrap();

    let ids = store
        .write(|wx| -> StoreResult<Vec<Flake>> { (0..17).map(|_| wx.next_id()).collect() })
        .unwrap();

    let config = FlakeConfig::default();
    for (n, id) in ids[..16].iter().enumerate() {
        let parts = id.parts(&config);
        assert_eq!(parts.timestamp_ms, start);
        assert_eq!(parts.sequence, n as u32);
    }
    let last = ids[16].parts(&config);
    assert_eq!(last.timestamp_ms, start + 1);
    assert_eq!(last.sequence, 0);
    assert_eq!(clock.sleeps(), vec![1]);

    for pair in ids.windows(2) {
        assert!(pair[0] < pair[1]);
        assert!(pair[0].to_bytes() < pair[1].to_bytes());
    }
}

#[test]
fn clock_regression_waits_out_the_difference() {
    let start = FlakeConfig::default().epoch_ms + 10_000;
    // A real sleep returns at least a little late.
    let clock = Arc::new(ManualClock::new(start).with_overshoot(1));
    let store = Store::in_memory_with_clock(StoreConfig::default(), chat(), clock.clone()).unwrap();

    let first = store.write(|wx| wx.next_id()).unwrap();
    clock.set(start - 40);
    let second = store.write(|wx| wx.next_id()).unwrap();

    assert_eq!(clock.sleeps(), vec![40]);
    let parts = second.parts(&FlakeConfig::default());
    assert_eq!(parts.timestamp_ms, start + 1);
    assert_eq!(parts.sequence, 0);
    assert!(first < second);

    let state = store.wx().unwrap().flake_state().unwrap().unwrap();
    assert_eq!(state.last, start + 1);
    assert_eq!(state.sequence, 0);
}

// ---------------------------------------------------------------------------
// Concurrent writers
// ---------------------------------------------------------------------------

#[test]
fn concurrent_writers_never_reuse_ids() {
    let store = Store::in_memory(chat()).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                let ids: Vec<Flake> = (0..200).map(|_| store.write(|wx| wx.next_id()).unwrap()).collect();
                for pair in ids.windows(2) {
                    assert!(pair[0] < pair[1]);
                }
                ids
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id), "{id} issued twice");
        }
    }
    assert_eq!(seen.len(), 8 * 200);
}
