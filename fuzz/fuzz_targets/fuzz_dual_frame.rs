//! Fuzz target: `DualLink::poll`
//!
//! Streams arbitrary bytes from a fake co-processor into a dual link and
//! asserts that every decoded request names an attached relay.
//!
//! cargo fuzz run fuzz_dual_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaynode::adapters::uart::UartPort;
use relaynode::drivers::dual::{self, DualLink};

fuzz_target!(|data: &[u8]| {
    let Some((&size, stream)) = data.split_first() else {
        return;
    };
    let size = usize::from(size) % (dual::DUAL_MAX + 1);

    let mut uart = UartPort::new(1);
    uart.inject(stream);
    let link = DualLink::new(uart);
    let _providers: Vec<_> = (0..size)
        .filter_map(|id| DualLink::attach(&link, id))
        .collect();

    let requests = link.borrow_mut().poll();
    assert!(requests.len() <= size);
    for (id, _) in requests {
        assert!(id < size);
    }

    for frame in stream.chunks_exact(4) {
        let _ = dual::decode(frame, size);
    }
});
