use std::cell::RefCell;
use std::rc::Rc;

use reactive_core::{atomic, atomic_async, computed, create_effect, flush_sync, in_atomic, signal};

#[derive(Debug)]
struct Boom;

#[test]
fn rollback_on_error_restores_the_pre_scope_value() {
    let s = signal(10);
    let runs = Rc::new(RefCell::new(0));
    let (s2, runs2) = (s.clone(), Rc::clone(&runs));
    let _disposer = create_effect(move || {
        s2.get();
        *runs2.borrow_mut() += 1;
        None
    });
    assert_eq!(*runs.borrow(), 1);

    let s3 = s.clone();
    let result: Result<(), Boom> = atomic(|| {
        s3.set(99);
        Err(Boom)
    });
    assert!(result.is_err());
    assert_eq!(s.get(), 10);
    flush_sync();
    assert_eq!(*runs.borrow(), 1, "effects must not run for a rolled-back write");
}

#[test]
fn rollback_marks_a_downstream_computed_stale_so_it_recomputes() {
    let s = signal(1);
    let s2 = s.clone();
    let c = computed(move || s2.get() * 2);
    assert_eq!(c.get(), 2);

    let s3 = s.clone();
    let c2 = c.clone();
    let result: Result<(), Boom> = atomic(move || {
        s3.set(5);
        assert_eq!(c2.get(), 10, "computed must see the in-scope write");
        Err(Boom)
    });
    assert!(result.is_err());
    assert_eq!(s.get(), 1);

    // `c` cached `10` while the scope was live; rollback must have marked
    // it stale so this read recomputes against the restored signal value
    // instead of returning the stale cached `10` forever.
    assert_eq!(c.get(), 2);
}

#[test]
fn commit_on_success_keeps_the_new_value() {
    let s = signal("a".to_string());
    let s2 = s.clone();
    let result: Result<(), Boom> = atomic(move || {
        s2.set("b".to_string());
        Ok(())
    });
    assert!(result.is_ok());
    assert_eq!(s.get(), "b");
}

#[test]
fn nested_atomic_commit_merges_first_seen_into_outer_log() {
    let s = signal(1);
    let (outer, inner) = (s.clone(), s.clone());
    let result: Result<(), Boom> = atomic(move || {
        outer.set(2);
        let inner_result: Result<(), Boom> = atomic(move || {
            inner.set(3);
            Ok(())
        });
        inner_result?;
        Err(Boom)
    });
    assert!(result.is_err());
    // Outer rollback must restore to 1 (the value before the outer scope
    // began), not 2 (the value the inner scope's own log would restore to).
    assert_eq!(s.get(), 1);
}

#[test]
fn in_atomic_reflects_scope_nesting() {
    assert!(!in_atomic());
    let _: Result<(), Boom> = atomic(|| {
        assert!(in_atomic());
        Ok(())
    });
    assert!(!in_atomic());
}

#[tokio::test]
async fn async_atomic_commits_after_an_await() {
    let s = signal("a".to_string());
    let s2 = s.clone();
    let result: Result<(), Boom> = atomic_async(|| async move {
        s2.set("b".to_string());
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        Ok(())
    })
    .await;
    assert!(result.is_ok());
    assert_eq!(s.get(), "b");
}

#[tokio::test]
async fn async_atomic_rolls_back_on_error_after_an_await() {
    let s = signal(10);
    let s2 = s.clone();
    let result: Result<(), Boom> = atomic_async(|| async move {
        s2.set(99);
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        Err(Boom)
    })
    .await;
    assert!(result.is_err());
    assert_eq!(s.get(), 10);
}
