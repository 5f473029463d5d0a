use super::*;
use std::thread;
use std::time::Duration;

// ============================================================================
// Blocking wait tests
// ============================================================================

#[test]
fn test_ready_is_immediately_available() {
    let cell = Pending::ready(Ok(7u32));
    assert!(cell.is_ready());
    assert_eq!(cell.try_get(), Some(Ok(7)));
    assert_eq!(cell.wait(), Ok(7));
}

#[test]
fn test_try_get_before_completion() {
    let (completer, cell) = pending::<u32>();
    assert!(!cell.is_ready());
    assert_eq!(cell.try_get(), None);
    completer.complete(Ok(1));
    assert_eq!(cell.try_get(), Some(Ok(1)));
}

#[test]
fn test_all_waiters_see_same_outcome() {
    let (completer, cell) = pending::<u32>();

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let cell = cell.clone();
            thread::spawn(move || cell.wait())
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    completer.complete(Err(Error::AllocationFailure("oom".to_string())));

    for waiter in waiters {
        assert_eq!(
            waiter.join().unwrap(),
            Err(Error::AllocationFailure("oom".to_string()))
        );
    }
}

#[test]
fn test_dropped_completer_fails_waiters() {
    let (completer, cell) = pending::<u32>();
    drop(completer);
    assert!(matches!(cell.wait(), Err(Error::BackendError(_))));
}

#[test]
fn test_panicking_producer_fails_waiters() {
    let (completer, cell) = pending::<u32>();
    let producer = thread::spawn(move || {
        let _completer = completer;
        panic!("loader crashed");
    });
    assert!(producer.join().is_err());
    assert!(matches!(cell.wait(), Err(Error::BackendError(_))));
}

// ============================================================================
// Future tests
// ============================================================================

#[test]
fn test_await_completed_from_other_thread() {
    let (completer, cell) = pending::<&'static str>();
    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        completer.complete(Ok("resident"));
    });

    let outcome = futures::executor::block_on(cell);
    assert_eq!(outcome, Ok("resident"));
    producer.join().unwrap();
}

#[test]
fn test_await_ready_cell() {
    let outcome = futures::executor::block_on(Pending::ready(Ok(3u8)));
    assert_eq!(outcome, Ok(3));
}
