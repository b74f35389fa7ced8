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

//! Reference-counted chunk chain.
//!
//! A chain is a singly linked list of [`Chunk`]s. Every chunk is in one of
//! three states:
//!
//! ```text
//!   Data(bytes, deleter, next) ──▶ Data(..) ──▶ Pending(resumer)
//!                                          └──▶ Finished
//! ```
//!
//! Only the last chunk of a chain is terminal (`Pending` or `Finished`).
//! A `Data` chunk always owns the link to its successor, so the type itself
//! rules out a data chunk without a tail.
//!
//! Chunks are shared through `Rc`: cloning a handle is the cheap "copy"
//! every cursor relies on, and dropping one releases the chunk (and any
//! uniquely owned successors) once the last handle is gone.

use crate::error::{StreamError, StreamResult};
use genawaiter::rc::Co;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Shared handle to a chunk.
pub(crate) type ChunkRef = Rc<Chunk>;

/// Bytes owned by a data chunk.
pub(crate) type ChunkBytes = Box<dyn AsRef<[u8]>>;

#[inline]
pub(crate) fn slice_of(bytes: &ChunkBytes) -> &[u8] {
    AsRef::<[u8]>::as_ref(&**bytes)
}

thread_local! {
    static FINISHED: ChunkRef = Rc::new(Chunk::with_buffer(Buffer::Finished));
}

/// Release obligation attached to an appended buffer.
///
/// Exactly one deleter is stored per data chunk and it is invoked exactly
/// once, when the last reference to that chunk goes away. A rejected or
/// zero-length append discharges its deleter immediately.
///
/// # Examples
///
/// ```rust
/// use feedstream::Deleter;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let released = Rc::new(Cell::new(0));
/// let counter = released.clone();
/// let shared = Deleter::borrowed(move |bytes: &[u8]| counter.set(counter.get() + bytes.len()));
/// assert!(matches!(shared, Deleter::Borrowed(_)));
///
/// let owned = Deleter::owned(|| println!("buffer released"));
/// assert!(matches!(owned, Deleter::Owned(_)));
/// ```
pub enum Deleter {
    /// A shared function that outlives the chunks using it, called with the
    /// bytes being released.
    Borrowed(Rc<dyn Fn(&[u8])>),
    /// A closure owned by one chunk, called with no arguments.
    Owned(Box<dyn FnOnce()>),
}

impl Deleter {
    /// Create a shared deleter that receives the released bytes.
    pub fn borrowed(f: impl Fn(&[u8]) + 'static) -> Self {
        Self::Borrowed(Rc::new(f))
    }

    /// Create an owned, one-shot deleter.
    pub fn owned(f: impl FnOnce() + 'static) -> Self {
        Self::Owned(Box::new(f))
    }

    /// A deleter with nothing to do beyond dropping the bytes.
    pub fn noop() -> Self {
        Self::Owned(Box::new(|| {}))
    }

    pub(crate) fn release(self, bytes: &[u8]) {
        match self {
            Self::Borrowed(f) => f(bytes),
            Self::Owned(f) => f(),
        }
    }
}

impl fmt::Debug for Deleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Borrowed(_) => f.write_str("Deleter::Borrowed"),
            Self::Owned(_) => f.write_str("Deleter::Owned"),
        }
    }
}

/// Handle used by a pending chunk to hand control back to the driver.
///
/// Every pending tail of one chain shares the same handle.
#[derive(Clone)]
pub(crate) struct Resumer(Rc<Co<()>>);

impl Resumer {
    pub(crate) fn new(co: Co<()>) -> Self {
        Self(Rc::new(co))
    }

    /// Suspend the parser until the driver resumes it.
    async fn suspend(&self) {
        self.0.yield_(()).await;
    }
}

struct Segment {
    bytes: ChunkBytes,
    deleter: Deleter,
    next: ChunkRef,
}

impl Segment {
    #[inline]
    fn bytes(&self) -> &[u8] {
        slice_of(&self.bytes)
    }

    /// Run the deleter and give back the link to the successor.
    fn release(self) -> ChunkRef {
        let Segment {
            bytes,
            deleter,
            next,
        } = self;
        trace!(len = slice_of(&bytes).len(), "releasing chunk buffer");
        deleter.release(slice_of(&bytes));
        next
    }
}

enum Buffer {
    Pending(Resumer),
    Finished,
    Data(Segment),
}

/// One buffered segment of a byte stream.
pub(crate) struct Chunk {
    buffer: RefCell<Buffer>,
}

impl Chunk {
    fn with_buffer(buffer: Buffer) -> Self {
        Self {
            buffer: RefCell::new(buffer),
        }
    }

    /// Make an extensible chunk with no data yet.
    pub(crate) fn pending(resumer: Resumer) -> ChunkRef {
        Rc::new(Self::with_buffer(Buffer::Pending(resumer)))
    }

    /// The shared end-of-data marker.
    pub(crate) fn finished() -> ChunkRef {
        FINISHED.with(Rc::clone)
    }

    /// Make a complete, non-extensible chain holding `bytes`.
    pub(crate) fn from_bytes(bytes: ChunkBytes, deleter: Deleter) -> ChunkRef {
        if slice_of(&bytes).is_empty() {
            deleter.release(slice_of(&bytes));
            return Self::finished();
        }
        Rc::new(Self::with_buffer(Buffer::Data(Segment {
            bytes,
            deleter,
            next: Self::finished(),
        })))
    }

    /// `true` if no chunk is linked after this one.
    pub(crate) fn is_terminal(&self) -> bool {
        !matches!(&*self.buffer.borrow(), Buffer::Data(_))
    }

    /// `true` if this chunk marks permanent end of data.
    pub(crate) fn is_finished(&self) -> bool {
        matches!(&*self.buffer.borrow(), Buffer::Finished)
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(&*self.buffer.borrow(), Buffer::Pending(_))
    }

    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        match &*self.buffer.borrow() {
            Buffer::Data(segment) => f(segment.bytes()),
            Buffer::Pending(_) | Buffer::Finished => f(&[]),
        }
    }

    /// Number of bytes in *this* chunk.
    pub(crate) fn size(&self) -> usize {
        self.with_bytes(<[u8]>::len)
    }

    /// Byte at `offset` of this chunk. Panics unless `offset < size()`.
    pub(crate) fn element_at(&self, offset: usize) -> u8 {
        self.with_bytes(|bytes| bytes[offset])
    }

    /// Copy `out.len()` bytes starting at `offset`, from this chunk only.
    pub(crate) fn copy_into(&self, out: &mut [u8], offset: usize) {
        self.with_bytes(|bytes| out.copy_from_slice(&bytes[offset..offset + out.len()]));
    }

    /// The successor, without giving up this reference.
    pub(crate) fn borrow_next(&self) -> Option<ChunkRef> {
        match &*self.buffer.borrow() {
            Buffer::Data(segment) => Some(Rc::clone(&segment.next)),
            Buffer::Pending(_) | Buffer::Finished => None,
        }
    }

    /// Trade a reference to this chunk for a reference to its successor.
    ///
    /// A shared chunk just loses one reference. A uniquely held chunk is
    /// released on the spot and its link to the successor is handed over.
    /// Terminal chunks have no successor and come back unchanged.
    pub(crate) fn next_chunk(this: ChunkRef) -> ChunkRef {
        debug_assert!(!this.is_terminal(), "next_chunk on a terminal chunk");
        if this.is_terminal() {
            return this;
        }
        match Rc::try_unwrap(this) {
            Ok(chunk) => match chunk.take_buffer() {
                Buffer::Data(segment) => segment.release(),
                Buffer::Pending(_) | Buffer::Finished => unreachable!("checked above"),
            },
            Err(shared) => match shared.borrow_next() {
                Some(next) => next,
                None => unreachable!("checked above"),
            },
        }
    }

    fn take_buffer(mut self) -> Buffer {
        std::mem::replace(self.buffer.get_mut(), Buffer::Finished)
    }

    /// Wait until this chunk has data or is finished.
    ///
    /// Suspends the parser for as long as the chunk is pending. Returns
    /// `true` once a successor is linked, `false` on end of data.
    pub(crate) async fn try_get_data(&self) -> bool {
        loop {
            let resumer = match &*self.buffer.borrow() {
                Buffer::Data(_) => return true,
                Buffer::Finished => return false,
                Buffer::Pending(resumer) => resumer.clone(),
            };
            trace!("chunk pending, suspending parser");
            resumer.suspend().await;
        }
    }

    /// Check that this chunk can still be extended.
    pub(crate) fn check_extensible(&self) -> StreamResult<()> {
        match &*self.buffer.borrow() {
            Buffer::Pending(_) => Ok(()),
            Buffer::Finished => Err(StreamError::Finished),
            Buffer::Data(_) => Err(StreamError::NotExtensible),
        }
    }

    /// Fill this pending chunk and return a reference to the new tail.
    ///
    /// A zero-length buffer leaves the chain untouched: its deleter runs
    /// right away and the same chunk comes back.
    pub(crate) fn append(this: ChunkRef, bytes: ChunkBytes, deleter: Deleter) -> ChunkRef {
        debug_assert!(this.is_pending(), "append on a chunk that is not pending");
        let resumer = match &*this.buffer.borrow() {
            Buffer::Pending(resumer) if !slice_of(&bytes).is_empty() => Some(resumer.clone()),
            _ => None,
        };
        let Some(resumer) = resumer else {
            deleter.release(slice_of(&bytes));
            return this;
        };
        let next = Self::pending(resumer);
        *this.buffer.borrow_mut() = Buffer::Data(Segment {
            bytes,
            deleter,
            next,
        });
        Self::next_chunk(this)
    }

    /// Mark this pending chunk as the permanent end of data.
    pub(crate) fn finish(&self) -> StreamResult<()> {
        self.check_extensible()?;
        *self.buffer.borrow_mut() = Buffer::Finished;
        Ok(())
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        // Walk the uniquely owned tail in a loop so long chains cannot
        // overflow the stack.
        let mut buffer = std::mem::replace(self.buffer.get_mut(), Buffer::Finished);
        while let Buffer::Data(segment) = buffer {
            match Rc::try_unwrap(segment.release()) {
                Ok(next) => buffer = next.take_buffer(),
                Err(_shared) => break,
            }
        }
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.buffer.borrow() {
            Buffer::Pending(_) => f.write_str("pending"),
            Buffer::Finished => f.write_str("finished"),
            Buffer::Data(segment) => write!(f, "data({})", segment.bytes().len()),
        }
    }
}
