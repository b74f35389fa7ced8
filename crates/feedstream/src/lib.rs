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

//! Incremental Input Streams
//!
//! This crate provides the input layer for parsers of binary formats (PDF,
//! fonts, images) whose data may arrive piecemeal. A parser is written once
//! against an immutable, cheaply cloned [`Stream`] cursor; the same code then
//! runs over a complete byte array or over a feed that grows as chunks are
//! appended.
//!
//! # Features
//!
//! - **Copy-free**: Appended buffers are linked into a chain, never copied
//! - **Lazy**: Data is consumed on demand and released as soon as no cursor needs it
//! - **Shared**: Any number of cursors may read the same chain independently
//! - **Suspendable**: Reads past the buffered data suspend the parser until more arrives
//!
//! # Architecture
//!
//! ```text
//!   driver ──append/finish──▶ [chunk] ─▶ [chunk] ─▶ [pending]
//!                                ▲          ▲
//!                             Stream     Stream  (windows with offsets)
//! ```
//!
//! - [`StreamData`]: shared handle to the front of the chunk chain
//! - [`Stream`]: a window (`offset`, `last_offset`) over a chain
//! - [`ParserThread`]: couples a driver with a suspendable parser coroutine
//! - [`Stream::run`]: runs a parser over complete input in one step
//!
//! # Complete Input
//!
//! ```rust
//! use feedstream::Stream;
//!
//! # fn main() -> Result<(), feedstream::StreamError> {
//! let stream = Stream::from_bytes("magic.bin", b"\x89PNG\r\n".to_vec());
//! let name = stream.run(|stream| async move {
//!     if !stream.has_prefix(b"\x89PNG").await {
//!         return None;
//!     }
//!     Some(stream.skip(1).await.take(3).byte_array().await)
//! })?;
//! assert_eq!(name.as_deref(), Some(&b"PNG"[..]));
//! # Ok(())
//! # }
//! ```
//!
//! # Incremental Input
//!
//! ```rust
//! use feedstream::ParserThread;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! # fn main() -> Result<(), feedstream::StreamError> {
//! let total = Rc::new(Cell::new(0));
//! let sink = total.clone();
//!
//! let mut thread = ParserThread::new("feed", move |stream| async move {
//!     sink.set(stream.length().await);
//! });
//!
//! for part in [&b"12"[..], b"345", b"6"] {
//!     thread.append(part)?;
//!     thread.resume()?;
//! }
//! thread.finish()?;
//! thread.resume()?;
//!
//! assert!(thread.is_done());
//! assert_eq!(total.get(), 6);
//! # Ok(())
//! # }
//! ```

mod chunk;
mod data;
mod error;
mod input;
mod stream;
mod thread;

pub use chunk::Deleter;
pub use data::StreamData;
pub use error::{StreamError, StreamResult};
pub use input::input_from_file;
pub use stream::{Stream, UNBOUNDED};
pub use thread::{ParserThread, ParserThreadConfig};
