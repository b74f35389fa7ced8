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

//! Parser-facing cursor over a chunk chain.
//!
//! A [`Stream`] is a window `[offset, last_offset)` over shared
//! [`StreamData`]. Cloning a stream is cheap and yields an independent
//! cursor over the same bytes, which is what lookahead and backtracking
//! parsers do all the time.
//!
//! # Suspension
//!
//! Operations that may need bytes that have not arrived yet are `async`.
//! When such an operation reaches a pending chunk it suspends the parser
//! coroutine and hands control back to the driver (see
//! [`ParserThread`](crate::ParserThread)). Streams built from a complete
//! byte array never suspend; [`Stream::run`] drives them synchronously.
//!
//! # Window states
//!
//! ```text
//!   within-chunk ──(offset reaches chunk_size)──▶ at-boundary
//!        ▲                                            │
//!        └──────(next chunk, size clamped)────────────┤
//!                                                     ▼
//!                            exhausted (chain released, chunk_size == 0)
//! ```
//!
//! A boundary at `last_offset` always leads to the exhausted state.
//!
//! # Examples
//!
//! ```rust
//! use feedstream::Stream;
//!
//! let input = Stream::from_bytes("doc", b"%PDF-1.7".to_vec());
//! input.run(|mut stream| async move {
//!     assert!(stream.has_prefix(b"%PDF").await);
//!
//!     let version = stream.skip(5).await.take(3);
//!     assert_eq!(version.byte_array().await, b"1.7");
//!
//!     assert_eq!(stream.skip_mut(4).await, 0);
//!     assert_eq!(stream.offset(), 4);
//! })?;
//! # Ok::<(), feedstream::StreamError>(())
//! ```

use crate::data::StreamData;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Marks a window with no upper bound.
pub const UNBOUNDED: usize = usize::MAX;

/// A consumer of data, where the data may be provided a little at a time.
///
/// Equality, ordering and hashing look at the position, the window end and
/// the name. They say which part of which input a stream denotes, never
/// whether two streams hold the same bytes.
#[derive(Clone)]
pub struct Stream {
    /// The data backing this stream.
    data: StreamData,
    /// Offset of the start of the current chunk, relative to the stream.
    chunk_offset: usize,
    /// Offset relative to the current chunk.
    /// Invariant: `chunk_size == 0 || offset < chunk_size`
    offset: usize,
    /// How much of the current chunk this stream may read. Less than the
    /// chunk's size when the window ends inside it.
    chunk_size: usize,
    /// Reads are only allowed below this offset.
    last_offset: usize,
    name: Rc<[u8]>,
}

impl Stream {
    /// Make an empty, non-extensible stream.
    pub fn empty() -> Self {
        Self {
            data: StreamData::empty(),
            chunk_offset: 0,
            offset: 0,
            chunk_size: 0,
            last_offset: 0,
            name: Rc::from(&[][..]),
        }
    }

    /// Make a stream over a complete byte array, bounded at its length.
    pub fn from_bytes(name: impl AsRef<[u8]>, bytes: impl AsRef<[u8]> + 'static) -> Self {
        let len = bytes.as_ref().len();
        Self {
            data: StreamData::from_bytes(bytes),
            chunk_offset: 0,
            offset: 0,
            chunk_size: len,
            last_offset: len,
            name: Rc::from(name.as_ref()),
        }
    }

    /// Make an unbounded stream over `data`, starting at offset 0.
    pub fn with_data(name: impl AsRef<[u8]>, data: StreamData) -> Self {
        Self::with_shared_name(Rc::from(name.as_ref()), data)
    }

    /// Like [`with_data`](Self::with_data), sharing an existing label.
    pub(crate) fn with_shared_name(name: Rc<[u8]>, data: StreamData) -> Self {
        let chunk_size = data.chunk_size();
        Self {
            data,
            chunk_offset: 0,
            offset: 0,
            chunk_size,
            last_offset: UNBOUNDED,
            name,
        }
    }

    /// The label of the input this stream reads.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// A shared copy of the label.
    pub fn name_rc(&self) -> Rc<[u8]> {
        Rc::clone(&self.name)
    }

    /// The current offset, relative to the beginning of the stream.
    #[inline]
    pub fn offset(&self) -> usize {
        self.chunk_offset + self.offset
    }

    /// End of the window, or [`UNBOUNDED`].
    #[inline]
    pub fn last_offset(&self) -> usize {
        self.last_offset
    }

    /// The chain this stream reads from.
    pub fn data(&self) -> &StreamData {
        &self.data
    }

    /// Let go of the underlying chain once the stream is known to be empty.
    fn make_empty(&mut self) {
        self.chunk_offset = self.offset();
        self.data = StreamData::empty();
        self.offset = 0;
        self.chunk_size = 0;
    }

    fn set_chunk_size(&mut self, global: usize) {
        self.chunk_size = self.data.chunk_size().min(self.last_offset - global);
    }

    /// Move past the end of the current chunk.
    ///
    /// Assumes the current chunk has been consumed and is not terminal.
    fn advance(&mut self) {
        let global = self.offset();
        if global == self.last_offset {
            self.make_empty();
            return;
        }
        self.data.next_chunk_mut();
        self.offset = 0;
        self.chunk_offset = global;
        self.set_chunk_size(global);
    }

    /// Check whether the stream is out of data for good.
    ///
    /// May suspend while the next chunk is pending.
    pub async fn is_empty(&mut self) -> bool {
        if self.offset < self.chunk_size {
            return false;
        }

        let global = self.offset();
        if global >= self.last_offset {
            return true;
        }

        debug_assert_eq!(self.chunk_size, 0);
        if !self.data.try_get_data().await {
            return true;
        }

        self.set_chunk_size(global);
        false
    }

    /// The byte at the current position.
    ///
    /// # Panics
    ///
    /// Assumes `!is_empty()`; panics when no byte is buffered here.
    pub fn head(&self) -> u8 {
        debug_assert!(self.offset < self.chunk_size, "head of an empty stream");
        self.data.element_at(self.offset)
    }

    /// Consume one byte. Returns `false` if the stream was empty.
    pub async fn skip_mut1(&mut self) -> bool {
        if self.is_empty().await {
            return false;
        }
        self.offset += 1;
        if self.offset == self.chunk_size {
            self.advance();
        }
        true
    }

    /// Advance the current position by `n` bytes.
    ///
    /// Returns how many bytes were *not* dropped: 0 if all of them were, or
    /// the shortfall if the data ran out first, in which case the stream is
    /// now empty.
    pub async fn skip_mut(&mut self, mut n: usize) -> usize {
        while n > 0 && !self.is_empty().await {
            let have = self.chunk_size - self.offset;
            if n < have {
                self.offset += n;
                return 0;
            }
            self.offset += have;
            n -= have;
            self.advance();
        }
        n
    }

    /// Restrict the stream to at most `n` more bytes.
    ///
    /// This does *not* check that `n` bytes exist, only that no more than
    /// that will be read.
    pub fn take_mut(&mut self, n: usize) {
        if n == 0 {
            self.last_offset = self.offset();
            self.make_empty();
            return;
        }

        let global = self.offset();
        let have = self.last_offset - global;
        if n >= have {
            return;
        }

        self.last_offset = global + n;
        self.chunk_size = self.chunk_size.min(self.offset + n);
    }

    /// A copy of this stream that reads at most `n` bytes.
    pub fn take(&self, n: usize) -> Stream {
        let mut res = self.clone();
        res.take_mut(n);
        res
    }

    /// A copy of this stream advanced by `n` bytes, or to the end of the
    /// data if there are fewer.
    pub async fn skip(&self, n: usize) -> Stream {
        let mut res = self.clone();
        res.skip_mut(n).await;
        res
    }

    /// A copy of this stream advanced by `n` bytes, or `None` if there is not
    /// enough data.
    pub async fn skip_maybe(&self, n: usize) -> Option<Stream> {
        let mut res = self.clone();
        if res.skip_mut(n).await == 0 {
            Some(res)
        } else {
            None
        }
    }

    /// Check if `prefix` is a prefix of the stream. The position of `self`
    /// does not change.
    pub async fn has_prefix(&self, prefix: &[u8]) -> bool {
        let mut peek = self.clone();
        for &expected in prefix {
            if peek.is_empty().await || peek.head() != expected {
                return false;
            }
            peek.skip_mut1().await;
        }
        true
    }

    /// Number of bytes left in the stream.
    ///
    /// Waits until the stream is finished or the window end is reached.
    pub async fn length(&self) -> usize {
        let mut n = 0;
        let mut peek = self.clone();
        while !peek.is_empty().await {
            let have = peek.chunk_size - peek.offset;
            n += have;
            peek.offset += have;
            peek.advance();
        }
        n
    }

    /// Copy all remaining bytes into a vector.
    ///
    /// Waits until the stream is finished or the window end is reached.
    pub async fn byte_array(&self) -> Vec<u8> {
        let n = self.length().await;
        let mut out = vec![0; n];
        self.data.copy_into(&mut out, self.offset);
        out
    }

    fn window(&self) -> WindowDisplay<'_> {
        WindowDisplay(self)
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::empty()
    }
}

struct WindowDisplay<'a>(&'a Stream);

impl fmt::Display for WindowDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stream = self.0;
        write!(f, "{}:{:#x}", stream.name.escape_ascii(), stream.offset())?;
        if stream.last_offset != UNBOUNDED {
            write!(f, "--{:#x}", stream.last_offset)?;
        }
        Ok(())
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stream(\"{}\":{:#x}", self.name.escape_ascii(), self.offset())?;
        if self.last_offset != UNBOUNDED {
            write!(f, "--{:#x}", self.last_offset)?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("name", &self.name.escape_ascii().to_string())
            .field("chunk_offset", &self.chunk_offset)
            .field("offset", &self.offset)
            .field("chunk_size", &self.chunk_size)
            .field("last_offset", &self.last_offset)
            .finish()
    }
}

/// Serializes as `{"$$input": "name:0xOFFSET--0xEND"}`.
impl Serialize for Stream {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("$$input", &self.window().to_string())?;
        map.end()
    }
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Stream {}

impl PartialOrd for Stream {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Stream {
    fn cmp(&self, other: &Self) -> Ordering {
        self.offset()
            .cmp(&other.offset())
            .then(self.last_offset.cmp(&other.last_offset))
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl Hash for Stream {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.offset().hash(state);
        self.last_offset.hash(state);
        self.name.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ten() -> Stream {
        Stream::from_bytes("ten", b"0123456789".to_vec())
    }

    // ==================== Construction tests ====================

    #[tokio::test]
    async fn test_empty_stream() {
        let mut stream = Stream::empty();
        assert!(stream.is_empty().await);
        assert_eq!(stream.offset(), 0);
        assert_eq!(stream.length().await, 0);
        assert!(stream.byte_array().await.is_empty());
    }

    #[tokio::test]
    async fn test_from_empty_bytes() {
        let mut stream = Stream::from_bytes("e", Vec::new());
        assert!(stream.is_empty().await);
        assert!(!stream.skip_mut1().await);
    }

    #[tokio::test]
    async fn test_with_data_is_unbounded() {
        let stream = Stream::with_data("d", StreamData::from_bytes(b"abc".to_vec()));
        assert_eq!(stream.last_offset(), UNBOUNDED);
        assert_eq!(stream.length().await, 3);
        assert_eq!(stream.byte_array().await, b"abc");
    }

    #[test]
    fn test_shared_name_is_not_copied() {
        let name: Rc<[u8]> = Rc::from(&b"shared"[..]);
        let stream = Stream::with_shared_name(Rc::clone(&name), StreamData::empty());
        assert!(Rc::ptr_eq(&stream.name_rc(), &name));
        assert_eq!(stream.name(), b"shared");
    }

    #[test]
    fn test_name_accessors() {
        let stream = ten();
        assert_eq!(stream.name(), b"ten");
        assert_eq!(&*stream.name_rc(), b"ten");
    }

    // ==================== Reading tests ====================

    #[tokio::test]
    async fn test_head_and_skip_mut1() {
        let mut stream = Stream::from_bytes("s", b"ab".to_vec());
        assert_eq!(stream.head(), b'a');
        assert!(stream.skip_mut1().await);
        assert_eq!(stream.head(), b'b');
        assert!(stream.skip_mut1().await);
        assert!(stream.is_empty().await);
        assert!(!stream.skip_mut1().await);
        assert_eq!(stream.offset(), 2);
    }

    #[tokio::test]
    async fn test_skip_mut_within_and_past_end() {
        let mut stream = ten();
        assert_eq!(stream.skip_mut(4).await, 0);
        assert_eq!(stream.offset(), 4);
        assert_eq!(stream.head(), b'4');

        assert_eq!(stream.skip_mut(10).await, 4);
        assert_eq!(stream.offset(), 10);
        assert!(stream.is_empty().await);
    }

    #[tokio::test]
    async fn test_skip_mut_exact_end_releases_chain() {
        let mut stream = ten();
        let data = stream.data().clone();
        assert_eq!(data.ref_count(), 2);

        assert_eq!(stream.skip_mut(10).await, 0);
        assert!(stream.is_empty().await);
        assert_eq!(data.ref_count(), 1);
    }

    #[tokio::test]
    async fn test_skip_mut_zero() {
        let mut stream = ten();
        assert_eq!(stream.skip_mut(0).await, 0);
        assert_eq!(stream.offset(), 0);
    }

    // ==================== Window tests ====================

    #[tokio::test]
    async fn test_take_hides_rest_of_source() {
        let stream = ten();
        let mut window = stream.take(3);
        assert_eq!(window.length().await, 3);
        assert_eq!(window.byte_array().await, b"012");

        assert_eq!(window.skip_mut(5).await, 2);
        assert!(window.is_empty().await);
        assert_eq!(window.offset(), 3);

        // The original is untouched.
        assert_eq!(stream.length().await, 10);
    }

    #[tokio::test]
    async fn test_take_in_middle_of_chunk() {
        let stream = ten().skip(4).await;
        let window = stream.take(3);
        assert_eq!(window.last_offset(), 7);
        assert_eq!(window.byte_array().await, b"456");
        assert!(!window.has_prefix(b"4567").await);
        assert!(window.has_prefix(b"456").await);
    }

    #[tokio::test]
    async fn test_take_larger_than_window_is_noop() {
        let mut stream = ten();
        stream.take_mut(100);
        assert_eq!(stream.last_offset(), 10);
        assert_eq!(stream.length().await, 10);
    }

    #[tokio::test]
    async fn test_take_zero_exhausts() {
        let mut stream = ten().skip(2).await;
        stream.take_mut(0);
        assert!(stream.is_empty().await);
        assert_eq!(stream.offset(), 2);
        assert_eq!(stream.length().await, 0);
    }

    #[tokio::test]
    async fn test_nested_take() {
        let stream = ten().take(6).skip(1).await.take(10);
        assert_eq!(stream.byte_array().await, b"12345");
    }

    // ==================== Cloning tests ====================

    #[tokio::test]
    async fn test_skip_preserves_original() {
        let stream = ten();
        let later = stream.skip(7).await;
        assert_eq!(later.offset(), 7);
        assert_eq!(stream.offset(), 0);
        assert_eq!(later.byte_array().await, b"789");
    }

    #[tokio::test]
    async fn test_skip_maybe() {
        let stream = ten();
        let some = stream.skip_maybe(10).await;
        assert!(some.is_some());
        assert_eq!(some.unwrap().offset(), 10);

        assert!(stream.skip_maybe(11).await.is_none());
        assert_eq!(stream.data().ref_count(), 1);
    }

    #[tokio::test]
    async fn test_has_prefix_keeps_position() {
        let stream = ten();
        assert!(stream.has_prefix(b"").await);
        assert!(stream.has_prefix(b"0123").await);
        assert!(!stream.has_prefix(b"0124").await);
        assert!(!stream.has_prefix(b"0123456789X").await);
        assert_eq!(stream.offset(), 0);
        assert_eq!(stream.data().ref_count(), 1);
    }

    // ==================== Identity tests ====================

    #[tokio::test]
    async fn test_equality_by_identity() {
        let a = Stream::from_bytes("x", b"abc".to_vec());
        let b = Stream::from_bytes("x", b"xyz".to_vec());
        assert_eq!(a, b);

        let c = Stream::from_bytes("y", b"abc".to_vec());
        assert_ne!(a, c);
        assert!(a < c);

        let moved = a.skip(1).await;
        assert_ne!(a, moved);
        assert!(a < moved);
        assert_ne!(a, a.take(2));
    }

    #[tokio::test]
    async fn test_hash_agrees_with_eq() {
        let mut set = HashSet::new();
        set.insert(Stream::from_bytes("x", b"abc".to_vec()));
        set.insert(Stream::from_bytes("x", b"def".to_vec()));
        set.insert(Stream::from_bytes("x", b"abc".to_vec()).skip(1).await);
        assert_eq!(set.len(), 2);
    }

    // ==================== Formatting tests ====================

    #[tokio::test]
    async fn test_display() {
        let stream = ten().skip(4).await;
        assert_eq!(stream.to_string(), "Stream(\"ten\":0x4--0xa)");

        let unbounded = Stream::with_data("in\"put", StreamData::empty());
        assert_eq!(unbounded.to_string(), "Stream(\"in\\\"put\":0x0)");
    }

    #[test]
    fn test_serialize_diagnostic_form() {
        let json = serde_json::to_string(&ten().take(2)).unwrap();
        assert_eq!(json, r#"{"$$input":"ten:0x0--0x2"}"#);
    }

    #[test]
    fn test_debug_shows_window() {
        let debug = format!("{:?}", ten());
        assert!(debug.contains("last_offset: 10"));
        assert!(debug.contains("\"ten\""));
    }
}
