// Dweve Feedstream - Incremental input streams for binary-format parsers
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![no_main]

use feedstream::ParserThread;
use libfuzzer_sys::fuzz_target;
use std::cell::RefCell;
use std::rc::Rc;

/// Fuzz target for chunked feeding.
///
/// The first byte of the input picks chunk sizes; the rest is split into
/// appends accordingly. Whatever the split, the parser must read back the
/// exact payload and every buffer must be released.
///
/// # Running the Fuzzer
///
/// ```bash
/// cd crates/feedstream
/// cargo fuzz run fuzz_chunked_input
/// ```
fuzz_target!(|data: &[u8]| {
    let Some((&seed, payload)) = data.split_first() else {
        return;
    };

    let out = Rc::new(RefCell::new(Vec::new()));
    let released = Rc::new(RefCell::new(0usize));
    let sink = out.clone();
    let count = released.clone();

    let mut thread = ParserThread::with_deleter(
        "fuzz",
        move |bytes: &[u8]| *count.borrow_mut() += bytes.len(),
        move |mut stream| async move {
            while !stream.is_empty().await {
                sink.borrow_mut().push(stream.head());
                stream.skip_mut1().await;
            }
        },
    );

    let step = usize::from(seed % 17) + 1;
    for piece in payload.chunks(step) {
        thread.append(piece.to_vec()).unwrap();
        thread.resume().unwrap();
    }
    thread.finish().unwrap();
    thread.resume().unwrap();
    assert!(thread.is_done());
    drop(thread);

    assert_eq!(&*out.borrow(), payload);
    assert_eq!(*released.borrow(), payload.len());
});
