/*!
Observable value cells for optisync.

A `Mut<T>` owns a value and notifies listeners whenever it is set. Readers get a
`Read<T>` handle which shares the same storage, so writers and readers are
different types and only readers can subscribe.

# Design requirements
- Writers and readers are different types
- Writers do not implement subscription methods
- Readers always see the present value
- Listeners are never called with a lock held, so they may read the signal or
  subscribe again from inside the callback

# Basic usage

```rust
use optisync_signals::*;
use std::sync::{Arc, Mutex};

let signal = Mut::new(42);
let seen = Arc::new(Mutex::new(Vec::new()));

let _guard = {
    let seen = seen.clone();
    signal.read().subscribe(move |value: i32| seen.lock().unwrap().push(value))
};

signal.set(43);
signal.update(|value| *value += 1);

assert_eq!(signal.read().get(), 44);
assert_eq!(*seen.lock().unwrap(), vec![43, 44]);
```
*/

pub mod broadcast;
pub mod porcelain;
pub mod signal;

pub use broadcast::{Broadcast, BroadcastId, Listener, ListenerGuard};
pub use porcelain::*;
pub use signal::*;
