use reactive_core::signal;

#[test]
fn basic_get_set_update() {
    let s = signal(1);
    assert_eq!(s.get(), 1);
    s.set(2);
    assert_eq!(s.get(), 2);
    s.update(|v| v + 1);
    assert_eq!(s.get(), 3);
}

#[test]
fn peek_does_not_panic_without_an_observer() {
    let s = signal("hello".to_string());
    assert_eq!(s.peek(), "hello");
}

#[test]
fn clones_share_the_same_cell() {
    let a = signal(1);
    let b = a.clone();
    a.set(42);
    assert_eq!(b.get(), 42);
}
