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

//! Incremental feeding example.
//!
//! Demonstrates a parser that reads a tiny tagged format while its input
//! arrives a few bytes at a time, the way a network download would hand it
//! over.
//!
//! Run with: cargo run --example incremental_feed

use feedstream::{ParserThread, Stream};
use std::cell::RefCell;
use std::rc::Rc;

/// Reads `tag:u8 len:u8 payload[len]` records until the input ends.
async fn read_records(mut stream: Stream, out: Rc<RefCell<Vec<(u8, Vec<u8>)>>>) {
    while !stream.is_empty().await {
        let tag = stream.head();
        stream.skip_mut1().await;
        if stream.is_empty().await {
            println!("  truncated record header at {}", stream);
            return;
        }
        let len = stream.head() as usize;
        stream.skip_mut1().await;

        let payload = stream.take(len);
        if payload.length().await < len {
            println!("  truncated payload at {}", payload);
            return;
        }
        out.borrow_mut().push((tag, payload.byte_array().await));
        stream.skip_mut(len).await;
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Incremental Feed Example ===\n");

    let input: &[u8] = b"\x01\x05hello\x02\x00\x03\x06world!";
    let records = Rc::new(RefCell::new(Vec::new()));
    let sink = records.clone();

    let mut thread = ParserThread::with_deleter(
        "records.bin",
        |bytes: &[u8]| println!("  released {} byte buffer", bytes.len()),
        move |stream| read_records(stream, sink),
    );

    for piece in input.chunks(3) {
        println!("Appending {:?}", piece.escape_ascii().to_string());
        thread.append(piece.to_vec())?;
        thread.resume()?;
    }
    thread.finish()?;
    thread.resume()?;
    println!("\nParser done: {}", thread.is_done());

    for (tag, payload) in records.borrow().iter() {
        println!("  record {}: {:?}", tag, payload.escape_ascii().to_string());
    }

    Ok(())
}
