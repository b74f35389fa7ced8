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

//! File input example.
//!
//! Demonstrates two ways of reading a file: loading it whole into a
//! complete stream, and pushing it through a parser thread in small reads.
//!
//! Run with: cargo run --example file_input -- <path>

use feedstream::{input_from_file, ParserThread, ParserThreadConfig};
use std::cell::Cell;
use std::fs::File;
use std::rc::Rc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: file_input <path>")?;

    println!("=== File Input Example ===\n");

    // Whole file at once.
    let stream = input_from_file(&path)?;
    let label = stream.to_string();
    let (length, is_pdf) = stream.run(|stream| async move {
        (stream.length().await, stream.has_prefix(b"%PDF-").await)
    })?;
    println!("{}: {} bytes, PDF: {}", label, length, is_pdf);

    // Same file, fed 4KB at a time.
    let seen = Rc::new(Cell::new(0));
    let sink = seen.clone();
    let config = ParserThreadConfig {
        read_buffer_size: 4096,
        ..Default::default()
    };
    let mut thread = ParserThread::with_config(path.as_str(), config, move |mut stream| async move {
        while !stream.is_empty().await {
            // Count bytes one chunk-sized hop at a time.
            let before = stream.offset();
            stream.skip_mut(1024).await;
            sink.set(sink.get() + stream.offset() - before);
        }
    });
    thread.feed_from(File::open(&path)?)?;
    println!("Fed through parser thread: {} bytes", seen.get());

    Ok(())
}
