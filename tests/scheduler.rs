use std::cell::RefCell;
use std::rc::Rc;

use reactive_core::{create_effect, flush_sync, set_flush_guard_limit, signal};

#[test]
fn flush_sync_is_a_no_op_with_nothing_queued() {
    flush_sync();
    flush_sync();
}

#[test]
#[should_panic(expected = "infinite-update-loop guard")]
fn infinite_update_loop_is_guarded() {
    set_flush_guard_limit(5);

    let a = signal(0);
    let a2 = a.clone();
    // Each run schedules itself again by writing to its own dependency,
    // so the queue never drains.
    let _disposer = create_effect(move || {
        let v = a2.get();
        a2.set(v + 1);
        None
    });
    flush_sync();
}

#[test]
fn effect_panic_does_not_stop_the_rest_of_the_round() {
    let a = signal(0);
    let b = signal(0);
    let b_runs = Rc::new(RefCell::new(0));
    let (a2, b2, b_runs2) = (a.clone(), b.clone(), Rc::clone(&b_runs));

    let _panics = create_effect(move || {
        a2.get();
        if a2.peek() > 0 {
            panic!("effect failure");
        }
        None
    });
    let _counts = create_effect(move || {
        b2.get();
        *b_runs2.borrow_mut() += 1;
        None
    });

    a.set(1);
    b.set(1);
    flush_sync();

    assert_eq!(*b_runs.borrow(), 2);
}
