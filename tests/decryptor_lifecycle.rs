use confidential_balances::{
    decryptor::{silent, table::MAX_TABLE_SIZE, DecryptorConfig, StatusCallback, StopSignal},
    errors::Error,
    group::value_point,
    testing, Balance, BalanceDecryptor,
};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

fn counting_status(finished: &Arc<AtomicUsize>) -> StatusCallback {
    let finished = finished.clone();
    Arc::new(move |msg: &str| {
        if msg == "100.00%" {
            finished.fetch_add(1, Ordering::SeqCst);
        }
    })
}

#[test]
fn concurrent_callers_share_one_build() {
    let decryptor = Arc::new(testing::small_decryptor(1 << 12).unwrap());
    let finished = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..8u64)
        .map(|n| {
            let decryptor = decryptor.clone();
            let status = counting_status(&finished);
            thread::spawn(move || {
                let balance: Balance = 1_000 + n * 10_007;
                let found = decryptor.decrypt_point(&value_point(balance), &StopSignal::new(), &status);
                (balance, found)
            })
        })
        .collect();

    for worker in workers {
        let (balance, found) = worker.join().unwrap();
        assert_eq!(found, Ok(balance));
    }
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(decryptor.table_size(), 1 << 12);
}

#[test]
fn search_is_cancellable() {
    let decryptor = BalanceDecryptor::new(DecryptorConfig {
        search_check_interval: 64,
        poll_interval: Duration::from_millis(1),
        ..DecryptorConfig::with_table_size(1 << 12)
    })
    .unwrap();
    let stop = StopSignal::new();
    decryptor.set_table_size(1 << 12, &stop, &silent()).unwrap();

    let stopper = {
        let stop = stop.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            stop.stop();
        })
    };

    let started = Instant::now();
    let result = decryptor.decrypt_point(&value_point(Balance::MAX - 5), &stop, &silent());
    assert!(matches!(result, Err(Error::SearchSuspended { attempted }) if attempted > 0));
    assert!(started.elapsed() < Duration::from_secs(5));
    stopper.join().unwrap();

    // The table survives a cancelled search.
    assert_eq!(decryptor.table_size(), 1 << 12);
    assert!(decryptor.current_table().is_some());
}

#[test]
fn construction_is_cancellable() {
    let decryptor = testing::small_decryptor(1 << 12).unwrap();
    let stop = StopSignal::new();
    let stopper = {
        let stop = stop.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stop.stop();
        })
    };

    let started = Instant::now();
    let result = decryptor.set_table_size(1 << 20, &stop, &silent());
    assert_eq!(result.err(), Some(Error::ConstructionAborted));
    assert!(started.elapsed() < Duration::from_secs(5));
    stopper.join().unwrap();

    // A later request builds a fresh table.
    let table = decryptor
        .set_table_size(1 << 12, &StopSignal::new(), &silent())
        .unwrap();
    assert_eq!(table.table_size(), 1 << 12);
    assert_eq!(
        decryptor.decrypt_point(&value_point(77), &StopSignal::new(), &silent()),
        Ok(77)
    );
}

#[test]
fn oversized_table_is_rejected() {
    let decryptor = testing::small_decryptor(1 << 10).unwrap();
    let stop = StopSignal::new();
    let table = decryptor.set_table_size(1 << 10, &stop, &silent()).unwrap();

    let size = MAX_TABLE_SIZE + 256;
    assert_eq!(
        decryptor.set_table_size(size, &stop, &silent()).err(),
        Some(Error::InvalidTableSize { size })
    );
    assert_eq!(decryptor.table_size(), 1 << 10);
    assert!(Arc::ptr_eq(&decryptor.current_table().unwrap(), &table));
}

#[test]
fn larger_size_supersedes_a_running_build() {
    let decryptor = Arc::new(testing::small_decryptor(1 << 10).unwrap());
    let reports = Arc::new(Mutex::new(Vec::new()));

    let first = {
        let decryptor = decryptor.clone();
        let reports = reports.clone();
        let status: StatusCallback = Arc::new(move |msg: &str| {
            reports.lock().unwrap().push(msg.to_string());
        });
        thread::spawn(move || decryptor.set_table_size(1 << 14, &StopSignal::new(), &status))
    };
    // Let the first build start before asking for more.
    while reports.lock().unwrap().is_empty() {
        thread::sleep(Duration::from_millis(1));
    }

    let larger = decryptor
        .set_table_size(1 << 15, &StopSignal::new(), &silent())
        .unwrap();
    assert_eq!(larger.table_size(), 1 << 15);

    // The first caller gets a table at least as large as it asked for.
    let table = first.join().unwrap().unwrap();
    assert!(table.table_size() >= 1 << 14);

    assert_eq!(decryptor.table_size(), 1 << 15);
    assert!(Arc::ptr_eq(&decryptor.current_table().unwrap(), &larger));
    assert_eq!(
        decryptor.decrypt_point(&value_point(40_000), &StopSignal::new(), &silent()),
        Ok(40_000)
    );
}

#[test]
fn failed_builder_releases_waiters() {
    let decryptor = Arc::new(testing::small_decryptor(1 << 12).unwrap());
    let started = Arc::new(AtomicBool::new(false));
    let failing: StatusCallback = {
        let started = started.clone();
        Arc::new(move |msg: &str| {
            if msg == "0.00%" {
                started.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(200));
                panic!("status sink went away");
            }
        })
    };

    let first = {
        let decryptor = decryptor.clone();
        thread::spawn(move || decryptor.set_table_size(1 << 12, &StopSignal::new(), &failing))
    };
    while !started.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(1));
    }

    // Joins the build that is about to fail.
    let begun = Instant::now();
    let waiter = decryptor.set_table_size(1 << 12, &StopSignal::new(), &silent());
    assert_eq!(waiter.err(), Some(Error::BuilderFailed));
    assert_eq!(first.join().unwrap().err(), Some(Error::BuilderFailed));
    assert!(begun.elapsed() < Duration::from_secs(5));
    assert_eq!(decryptor.table_size(), 0);

    // The next request builds again.
    let table = decryptor
        .set_table_size(1 << 12, &StopSignal::new(), &silent())
        .unwrap();
    assert_eq!(table.table_size(), 1 << 12);
    assert_eq!(
        decryptor.decrypt_point(&value_point(0), &StopSignal::new(), &silent()),
        Ok(0)
    );
}
