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

//! The data source behind a stream.
//!
//! [`StreamData`] is a handle to the front of a chunk chain. Cloning it shares
//! the chain; no bytes are ever copied. Cursors move their own handle forward
//! with [`StreamData::next_chunk_mut`], which lets go of chunks nobody else is
//! looking at.

use crate::chunk::{slice_of, Chunk, ChunkBytes, ChunkRef, Deleter, Resumer};
use crate::error::StreamResult;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// Shared handle to the front of a chunk chain.
///
/// # Examples
///
/// ```rust
/// use feedstream::StreamData;
///
/// let data = StreamData::from_bytes(b"%PDF".to_vec());
/// assert_eq!(data.chunk_size(), 4);
/// assert_eq!(data.element_at(1), b'P');
///
/// let mut out = [0u8; 3];
/// data.copy_into(&mut out, 1);
/// assert_eq!(&out, b"PDF");
/// ```
#[derive(Clone)]
pub struct StreamData {
    head: ChunkRef,
}

impl StreamData {
    /// Make a non-extensible stream with no data.
    pub fn empty() -> Self {
        Self {
            head: Chunk::finished(),
        }
    }

    /// Make a non-extensible stream containing `bytes`.
    pub fn from_bytes(bytes: impl AsRef<[u8]> + 'static) -> Self {
        Self::from_bytes_with(bytes, Deleter::noop())
    }

    /// Like [`from_bytes`](Self::from_bytes), running `deleter` once the
    /// bytes are no longer referenced.
    pub fn from_bytes_with(bytes: impl AsRef<[u8]> + 'static, deleter: Deleter) -> Self {
        Self {
            head: Chunk::from_bytes(Box::new(bytes), deleter),
        }
    }

    /// Make an extensible stream with no data yet.
    pub(crate) fn extensible(resumer: Resumer) -> Self {
        Self {
            head: Chunk::pending(resumer),
        }
    }

    /// `true` if no data is buffered past the current chunk.
    pub fn is_terminal(&self) -> bool {
        self.head.is_terminal()
    }

    /// `true` if the stream has ended and will get no more data.
    pub fn is_finished(&self) -> bool {
        self.head.is_finished()
    }

    /// Size of the first chunk.
    pub fn chunk_size(&self) -> usize {
        self.head.size()
    }

    /// Element at `offset` of the *first* chunk.
    ///
    /// # Panics
    ///
    /// Panics unless `offset < self.chunk_size()`.
    pub fn element_at(&self, offset: usize) -> u8 {
        debug_assert!(offset < self.chunk_size());
        self.head.element_at(offset)
    }

    /// `true` unless the chain ends in a pending chunk that a running
    /// parser thread may still fill.
    pub fn is_complete(&self) -> bool {
        self.chunks().last().map_or(true, |tail| !tail.is_pending())
    }

    /// Number of handles sharing the first chunk.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.head)
    }

    /// Wait for the first chunk to get data.
    ///
    /// May suspend the parser. Returns `false` once the stream is finished.
    pub async fn try_get_data(&self) -> bool {
        self.head.try_get_data().await;
        !self.head.is_finished()
    }

    fn replace_head(&mut self, f: impl FnOnce(ChunkRef) -> ChunkRef) {
        let head = std::mem::replace(&mut self.head, Chunk::finished());
        self.head = f(head);
    }

    /// Advance to the next chunk.
    ///
    /// Assumes: `!self.is_terminal()`
    pub(crate) fn next_chunk_mut(&mut self) {
        self.replace_head(Chunk::next_chunk);
    }

    /// Append a buffer at the pending end of the stream and move this
    /// handle to the new end.
    ///
    /// The deleter runs exactly once: right away for a zero-length or
    /// rejected buffer, otherwise when the chunk holding it is released.
    pub(crate) fn append_mut(&mut self, bytes: ChunkBytes, deleter: Deleter) -> StreamResult<()> {
        if let Err(err) = self.head.check_extensible() {
            warn!(%err, "append rejected, releasing buffer");
            deleter.release(slice_of(&bytes));
            return Err(err);
        }
        let len = slice_of(&bytes).len();
        self.replace_head(|head| Chunk::append(head, bytes, deleter));
        debug!(len, "appended chunk");
        Ok(())
    }

    /// Terminate the stream.
    pub(crate) fn finish_mut(&self) -> StreamResult<()> {
        self.head.finish()?;
        debug!("stream finished");
        Ok(())
    }

    /// Copy `out.len()` bytes, starting at `offset` of the first chunk.
    ///
    /// Crosses chunk boundaries as needed.
    ///
    /// # Panics
    ///
    /// Panics if fewer bytes are buffered than requested; make sure they are
    /// available first, e.g. with `Stream::length`.
    pub fn copy_into(&self, out: &mut [u8], offset: usize) {
        let mut chunk = Rc::clone(&self.head);
        let mut offset = offset;
        let mut copied = 0;
        while copied < out.len() {
            let size = chunk.size();
            assert!(offset < size, "copy_into past the buffered data");
            let have = (size - offset).min(out.len() - copied);
            chunk.copy_into(&mut out[copied..copied + have], offset);
            copied += have;
            offset = 0;
            chunk = chunk.borrow_next().unwrap_or_else(Chunk::finished);
        }
    }

    fn chunks(&self) -> impl Iterator<Item = ChunkRef> {
        std::iter::successors(Some(Rc::clone(&self.head)), |chunk| chunk.borrow_next())
    }

    /// Log the chunks of the chain at debug level.
    pub fn dump(&self) {
        for (index, chunk) in self.chunks().enumerate() {
            debug!(index, refs = Rc::strong_count(&chunk) - 1, state = ?chunk, "chunk");
        }
    }
}

impl Default for StreamData {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for StreamData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StreamData")?;
        for (index, chunk) in self.chunks().enumerate() {
            if index > 0 {
                f.write_str(" ->")?;
            }
            write!(f, " [{}|{:?}]", Rc::strong_count(&chunk) - 1, chunk)?;
        }
        Ok(())
    }
}
