use std::sync::{Arc, Mutex};

#[ctor::ctor]
fn init_tracing() { let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).with_test_writer().try_init(); }

/// Returns a listener that records every value it is given, and a closure that drains the recorded values
#[allow(unused)]
pub fn change_watcher<T: Send + Sync + 'static>() -> (impl Fn(T) + Send + Sync + 'static, impl Fn() -> Vec<T>) {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let watcher = {
        let changes = changes.clone();
        move |value: T| changes.lock().unwrap().push(value)
    };
    let check = move || changes.lock().unwrap().drain(..).collect::<Vec<T>>();
    (watcher, check)
}
