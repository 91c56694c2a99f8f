use std::cell::RefCell;
use std::rc::Rc;

use reactive_core::{computed, signal, ComputedHandle};

#[test]
#[should_panic]
fn mutually_recursive_computeds_are_detected() {
    let slot: Rc<RefCell<Option<ComputedHandle<i32>>>> = Rc::new(RefCell::new(None));
    let slot_for_b = Rc::clone(&slot);

    let b = computed(move || {
        let a = slot_for_b.borrow().as_ref().unwrap().clone();
        a.get() + 1
    });
    let b_for_a = b.clone();
    let a = computed(move || b_for_a.get() + 1);
    *slot.borrow_mut() = Some(a);

    b.get();
}

#[test]
fn non_cyclic_diamond_dependency_is_fine() {
    let root = signal(1);
    let (r1, r2) = (root.clone(), root.clone());
    let left = computed(move || r1.get() + 1);
    let right = computed(move || r2.get() + 2);
    let (l, r) = (left.clone(), right.clone());
    let bottom = computed(move || l.get() + r.get());
    assert_eq!(bottom.get(), 5);
    root.set(10);
    assert_eq!(bottom.get(), 23);
}
