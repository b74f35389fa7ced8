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

//! Coupling between a data producer and a parser coroutine.
//!
//! A [`ParserThread`] runs a parser against a [`Stream`] whose bytes are
//! supplied piecemeal by the driver. Both sides share one OS thread and
//! strictly alternate:
//!
//! ```text
//!   Driver                         Parser coroutine
//!     │──append(bytes)──▶ chain        │
//!     │──resume()─────────────────────▶│ reads until a chunk is pending
//!     │◀───────────────────suspend─────│
//!     │──append / finish──▶ chain      │
//!     │──resume()─────────────────────▶│ ... returns
//!     │◀───────────────────done────────│
//! ```
//!
//! Resuming carries no payload. The parser simply observes whatever the
//! driver appended (or that it called `finish`) while it was suspended.
//!
//! # Examples
//!
//! ```rust
//! use feedstream::ParserThread;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! # fn main() -> Result<(), feedstream::StreamError> {
//! let header = Rc::new(RefCell::new(Vec::new()));
//! let sink = header.clone();
//!
//! let mut thread = ParserThread::new("input.pdf", move |stream| async move {
//!     *sink.borrow_mut() = stream.take(7).byte_array().await;
//! });
//!
//! thread.append(b"%PDF".to_vec())?;
//! thread.resume()?;
//! assert!(!thread.is_done());
//!
//! thread.append(b"-1.7\n".to_vec())?;
//! thread.resume()?;
//! assert!(thread.is_done());
//! assert_eq!(&*header.borrow(), b"%PDF-1.7");
//! # Ok(())
//! # }
//! ```

use crate::chunk::{Deleter, Resumer};
use crate::data::StreamData;
use crate::error::{StreamError, StreamResult};
use crate::stream::Stream;
use genawaiter::rc::{Co, Gen};
use genawaiter::GeneratorState;
use std::fmt;
use std::future::Future;
use std::io::{ErrorKind, Read};
use std::pin::Pin;
use std::rc::Rc;
use tracing::{debug, trace};

type ParserFuture = Pin<Box<dyn Future<Output = ()>>>;

/// Configuration options for a parser thread.
///
/// # Examples
///
/// ```rust
/// use feedstream::ParserThreadConfig;
///
/// let config = ParserThreadConfig::default();
/// assert_eq!(config.limit, None);
/// assert_eq!(config.read_buffer_size, 64 * 1024);
///
/// let header_only = ParserThreadConfig {
///     limit: Some(1024),
///     ..Default::default()
/// };
/// assert_eq!(header_only.limit, Some(1024));
/// ```
#[derive(Debug, Clone)]
pub struct ParserThreadConfig {
    /// Upper bound on the bytes the parser's stream may read.
    ///
    /// Default: None (unbounded)
    pub limit: Option<usize>,

    /// Size of each read performed by [`ParserThread::feed_from`].
    ///
    /// Default: 64KB
    pub read_buffer_size: usize,
}

impl Default for ParserThreadConfig {
    fn default() -> Self {
        Self {
            limit: None,
            read_buffer_size: 64 * 1024,
        }
    }
}

/// A parser coroutine together with the extensible stream it reads.
///
/// The parser is an async callback receiving a [`Stream`]. It must only
/// await stream operations; awaiting anything else would suspend it in a
/// way the driver cannot resume.
///
/// Cursors may outlive the parser, for instance when it stores a lazily
/// read sub-stream in its result. Once the parser has returned, or the
/// thread is dropped, the chain is closed and such cursors see end of data
/// where the feed stopped. Read them with [`Stream::run`].
pub struct ParserThread {
    // Declared first so it drops first: the parser's cursors go away
    // before the driver's handle on the chain.
    coroutine: Gen<(), (), ParserFuture>,
    data: StreamData,
    deleter: Rc<dyn Fn(&[u8])>,
    done: bool,
    finish_requested: bool,
    name: Rc<[u8]>,
    config: ParserThreadConfig,
}

impl ParserThread {
    /// Create a parser thread whose simple [`append`](Self::append) just
    /// drops the buffers it is given.
    pub fn new<F, Fut>(name: impl AsRef<[u8]>, parser: F) -> Self
    where
        F: FnOnce(Stream) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Self::build(
            name.as_ref(),
            Rc::new(|_: &[u8]| {}),
            ParserThreadConfig::default(),
            parser,
        )
    }

    /// Create a parser thread whose simple [`append`](Self::append) hands
    /// every released buffer to `deleter`.
    pub fn with_deleter<F, Fut>(
        name: impl AsRef<[u8]>,
        deleter: impl Fn(&[u8]) + 'static,
        parser: F,
    ) -> Self
    where
        F: FnOnce(Stream) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Self::build(
            name.as_ref(),
            Rc::new(deleter),
            ParserThreadConfig::default(),
            parser,
        )
    }

    /// Create a parser thread with custom configuration.
    pub fn with_config<F, Fut>(name: impl AsRef<[u8]>, config: ParserThreadConfig, parser: F) -> Self
    where
        F: FnOnce(Stream) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Self::build(name.as_ref(), Rc::new(|_: &[u8]| {}), config, parser)
    }

    fn build<F, Fut>(
        name: &[u8],
        deleter: Rc<dyn Fn(&[u8])>,
        config: ParserThreadConfig,
        parser: F,
    ) -> Self
    where
        F: FnOnce(Stream) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let name: Rc<[u8]> = Rc::from(name);
        let mut data = StreamData::empty();
        let limit = config.limit;
        let coroutine = Gen::new(|co| {
            data = StreamData::extensible(Resumer::new(co));
            let mut stream = Stream::with_shared_name(Rc::clone(&name), data.clone());
            if let Some(limit) = limit {
                stream.take_mut(limit);
            }
            let future: ParserFuture = Box::pin(async move { parser(stream).await });
            future
        });
        debug!(name = %name.escape_ascii(), ?config, "parser thread created");
        Self {
            coroutine,
            data,
            deleter,
            done: false,
            finish_requested: false,
            name,
            config,
        }
    }

    /// The label given to the parser's stream.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Check if the parser callback has returned.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Run the parser until it needs more data or returns.
    pub fn resume(&mut self) -> StreamResult<()> {
        if self.done {
            return Err(StreamError::ParserDone);
        }
        match self.coroutine.resume() {
            GeneratorState::Yielded(()) => trace!("parser suspended, awaiting data"),
            GeneratorState::Complete(()) => {
                self.done = true;
                self.close_tail();
                debug!(name = %self.name.escape_ascii(), "parser finished");
            }
        }
        Ok(())
    }

    /// End the chain for cursors that outlive the parser.
    fn close_tail(&self) {
        if self.data.is_finished() {
            return;
        }
        if let Err(err) = self.data.finish_mut() {
            trace!(%err, "tail already closed");
        }
    }

    /// Provide more data, released through the thread's shared deleter.
    pub fn append(&mut self, bytes: impl AsRef<[u8]> + 'static) -> StreamResult<()> {
        let deleter = Deleter::Borrowed(Rc::clone(&self.deleter));
        self.append_deleter(bytes, deleter)
    }

    /// Provide more data with a one-shot release callback.
    pub fn append_with(
        &mut self,
        bytes: impl AsRef<[u8]> + 'static,
        deleter: impl FnOnce() + 'static,
    ) -> StreamResult<()> {
        self.append_deleter(bytes, Deleter::owned(deleter))
    }

    /// Provide more data with an explicit deleter.
    ///
    /// Does not run the parser; call [`resume`](Self::resume) for that.
    /// The deleter runs exactly once, immediately if the append fails.
    pub fn append_deleter(
        &mut self,
        bytes: impl AsRef<[u8]> + 'static,
        deleter: Deleter,
    ) -> StreamResult<()> {
        if self.done {
            deleter.release(bytes.as_ref());
            return Err(StreamError::ParserDone);
        }
        self.data.append_mut(Box::new(bytes), deleter)
    }

    /// Terminate the data stream.
    ///
    /// The parser sees the end of data the next time it is resumed. After
    /// the parser has returned the chain is already closed, so this only
    /// records the request.
    pub fn finish(&mut self) -> StreamResult<()> {
        if self.finish_requested {
            return Err(StreamError::Finished);
        }
        self.finish_requested = true;
        if self.done {
            return Ok(());
        }
        self.data.finish_mut()
    }

    /// Feed everything `reader` produces to the parser.
    ///
    /// Reads [`read_buffer_size`](ParserThreadConfig::read_buffer_size)
    /// bytes at a time, resuming the parser after each read. At end of
    /// input the stream is finished and the parser resumed one last time.
    /// Stops early if the parser returns.
    pub fn feed_from<R: Read>(&mut self, mut reader: R) -> StreamResult<()> {
        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];
        while !self.done {
            let n = match reader.read(&mut buf) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                self.finish()?;
                self.resume()?;
                break;
            }
            self.append(buf[..n].to_vec())?;
            self.resume()?;
        }
        Ok(())
    }
}

impl Drop for ParserThread {
    fn drop(&mut self) {
        // The coroutine goes right after this; nothing will fill the tail.
        self.close_tail();
    }
}

impl Stream {
    /// Run `parser` over this stream to completion, synchronously.
    ///
    /// Meant for complete input, such as [`Stream::from_bytes`] or
    /// [`input_from_file`](crate::input_from_file), and for cursors left
    /// over from a parser thread that has returned or was dropped. Reads
    /// never suspend there, so the parser finishes in a single step.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Incomplete`] if the chain may still grow,
    /// i.e. its parser thread is running.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use feedstream::Stream;
    ///
    /// let stream = Stream::from_bytes("magic.bin", b"GIF89a".to_vec());
    /// let version = stream.run(|stream| async move {
    ///     if stream.has_prefix(b"GIF").await {
    ///         Some(stream.skip(3).await.byte_array().await)
    ///     } else {
    ///         None
    ///     }
    /// })?;
    /// assert_eq!(version.as_deref(), Some(&b"89a"[..]));
    /// # Ok::<(), feedstream::StreamError>(())
    /// ```
    pub fn run<T, F, Fut>(self, parser: F) -> StreamResult<T>
    where
        F: FnOnce(Stream) -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.data().is_complete() {
            return Err(StreamError::Incomplete);
        }
        let mut coroutine = Gen::new(|_co: Co<()>| parser(self));
        match coroutine.resume() {
            GeneratorState::Complete(value) => Ok(value),
            GeneratorState::Yielded(()) => Err(StreamError::Incomplete),
        }
    }
}

impl fmt::Debug for ParserThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserThread")
            .field("name", &self.name.escape_ascii().to_string())
            .field("done", &self.done)
            .field("data", &self.data)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::io::{self, Cursor};

    type Shared<T> = Rc<RefCell<T>>;

    /// Parser that copies every byte it sees.
    fn collector(out: &Shared<Vec<u8>>) -> impl FnOnce(Stream) -> ParserFuture {
        let sink = out.clone();
        move |mut stream: Stream| -> ParserFuture {
            Box::pin(async move {
                while !stream.is_empty().await {
                    sink.borrow_mut().push(stream.head());
                    stream.skip_mut1().await;
                }
            })
        }
    }

    // ==================== Lifecycle tests ====================

    #[test]
    fn test_parser_runs_on_first_resume() {
        let started = Rc::new(Cell::new(false));
        let flag = started.clone();
        let mut thread = ParserThread::new("doc", move |_stream| async move {
            flag.set(true);
        });
        assert!(!started.get());
        assert!(!thread.is_done());

        thread.resume().unwrap();
        assert!(started.get());
        assert!(thread.is_done());
    }

    #[test]
    fn test_resume_after_done_fails() {
        let mut thread = ParserThread::new("doc", |_stream| async {});
        thread.resume().unwrap();
        assert!(matches!(thread.resume(), Err(StreamError::ParserDone)));
    }

    #[test]
    fn test_append_after_done_discharges_deleter() {
        let released = Rc::new(Cell::new(0));
        let counter = released.clone();
        let mut thread = ParserThread::new("doc", |_stream| async {});
        thread.resume().unwrap();

        let result = thread.append_with(b"x".to_vec(), move || counter.set(counter.get() + 1));
        assert!(matches!(result, Err(StreamError::ParserDone)));
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn test_append_after_finish_fails() {
        let mut thread = ParserThread::new("doc", |_stream| async {});
        thread.finish().unwrap();
        assert!(matches!(thread.append(b"x".to_vec()), Err(StreamError::Finished)));
        assert!(matches!(thread.finish(), Err(StreamError::Finished)));
    }

    // ==================== Feeding tests ====================

    #[test]
    fn test_pdf_version_scenario() {
        let bytes = Rc::new(RefCell::new(Vec::new()));
        let empty_after = Rc::new(Cell::new(None));
        let (sink, flag) = (bytes.clone(), empty_after.clone());

        let mut thread = ParserThread::new("doc.pdf", move |mut stream| async move {
            *sink.borrow_mut() = stream.take(7).byte_array().await;
            stream.skip_mut(7).await;
            flag.set(Some(stream.is_empty().await));
        });

        thread.append(b"PDF".to_vec()).unwrap();
        thread.resume().unwrap();
        assert!(!thread.is_done());

        thread.append(b"-1.7".to_vec()).unwrap();
        thread.resume().unwrap();
        assert!(!thread.is_done(), "parser waits to learn whether more data follows");
        assert_eq!(&*bytes.borrow(), b"PDF-1.7");

        thread.finish().unwrap();
        thread.resume().unwrap();
        assert!(thread.is_done());
        assert_eq!(empty_after.get(), Some(true));
    }

    #[test]
    fn test_data_appended_before_first_resume_is_seen() {
        let out = Rc::new(RefCell::new(Vec::new()));
        let mut thread = ParserThread::new("doc", collector(&out));
        thread.append(b"ab".to_vec()).unwrap();
        thread.append(b"cd".to_vec()).unwrap();
        thread.finish().unwrap();
        thread.resume().unwrap();

        assert!(thread.is_done());
        assert_eq!(&*out.borrow(), b"abcd");
    }

    #[test]
    fn test_zero_length_append_keeps_parser_waiting() {
        let out = Rc::new(RefCell::new(Vec::new()));
        let mut thread = ParserThread::new("doc", collector(&out));
        thread.resume().unwrap();
        thread.append(Vec::new()).unwrap();
        thread.resume().unwrap();
        assert!(!thread.is_done());
        assert!(out.borrow().is_empty());

        thread.append(b"z".to_vec()).unwrap();
        thread.finish().unwrap();
        thread.resume().unwrap();
        assert!(thread.is_done());
        assert_eq!(&*out.borrow(), b"z");
    }

    #[test]
    fn test_limit_config_bounds_stream() {
        let out = Rc::new(RefCell::new(Vec::new()));
        let config = ParserThreadConfig {
            limit: Some(3),
            ..Default::default()
        };
        let mut thread = ParserThread::with_config("doc", config, collector(&out));
        thread.append(b"abcdef".to_vec()).unwrap();
        thread.resume().unwrap();

        // The window ends before the pending tail, so no finish is needed.
        assert!(thread.is_done());
        assert_eq!(&*out.borrow(), b"abc");
    }

    // ==================== Deleter tests ====================

    #[test]
    fn test_consumed_chunks_are_released_eagerly() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let log = released.clone();
        let out = Rc::new(RefCell::new(Vec::new()));
        let mut thread = ParserThread::with_deleter(
            "doc",
            move |bytes: &[u8]| log.borrow_mut().push(bytes.to_vec()),
            collector(&out),
        );

        thread.resume().unwrap();
        thread.append(b"one".to_vec()).unwrap();
        thread.resume().unwrap();
        // The parser moved past "one" and nothing else refers to it.
        assert_eq!(*released.borrow(), vec![b"one".to_vec()]);

        thread.append(b"two".to_vec()).unwrap();
        thread.resume().unwrap();
        assert_eq!(*released.borrow(), vec![b"one".to_vec(), b"two".to_vec()]);

        thread.finish().unwrap();
        thread.resume().unwrap();
        assert!(thread.is_done());
        assert_eq!(released.borrow().len(), 2);
        assert_eq!(&*out.borrow(), b"onetwo");
    }

    #[test]
    fn test_drop_while_suspended_releases_everything() {
        let released = Rc::new(Cell::new(0));

        let mut thread = ParserThread::new("doc", move |stream| async move {
            let mut lookahead = stream.clone();
            // Never satisfied: the driver abandons the parser first.
            lookahead.skip_mut(usize::MAX).await;
            drop(stream);
        });

        for part in [&b"abc"[..], b"def"] {
            let counter = released.clone();
            thread
                .append_with(part, move || counter.set(counter.get() + 1))
                .unwrap();
            thread.resume().unwrap();
        }
        assert!(!thread.is_done());
        // The parser's own cursor still pins the first chunk.
        assert_eq!(released.get(), 0);

        drop(thread);
        assert_eq!(released.get(), 2);
    }

    // ==================== Surviving cursor tests ====================

    /// Parser that keeps a copy of its stream, then optionally reads on.
    fn escaping(
        slot: &Shared<Option<Stream>>,
        read_on: bool,
    ) -> impl FnOnce(Stream) -> ParserFuture {
        let slot = slot.clone();
        move |mut stream: Stream| -> ParserFuture {
            Box::pin(async move {
                *slot.borrow_mut() = Some(stream.clone());
                if read_on {
                    stream.skip_mut(usize::MAX).await;
                }
            })
        }
    }

    #[test]
    fn test_cursor_outliving_returned_parser_sees_end() {
        let escaped = Rc::new(RefCell::new(None));
        let mut thread = ParserThread::new("doc", escaping(&escaped, false));
        thread.append(b"ab".to_vec()).unwrap();
        thread.resume().unwrap();
        assert!(thread.is_done());

        let stream = escaped.borrow_mut().take().unwrap();
        let (bytes, shortfall, empty) = stream
            .run(|mut stream| async move {
                let bytes = stream.byte_array().await;
                let shortfall = stream.skip_mut(3).await;
                (bytes, shortfall, stream.is_empty().await)
            })
            .unwrap();
        assert_eq!(bytes, b"ab");
        assert_eq!(shortfall, 1);
        assert!(empty);

        // The driver may still declare the end once.
        thread.finish().unwrap();
        assert!(matches!(thread.finish(), Err(StreamError::Finished)));
    }

    #[test]
    fn test_cursor_outliving_dropped_thread_sees_end() {
        let escaped = Rc::new(RefCell::new(None));
        let mut thread = ParserThread::new("doc", escaping(&escaped, true));
        thread.append(b"ab".to_vec()).unwrap();
        thread.resume().unwrap();
        thread.append(b"cd".to_vec()).unwrap();
        thread.resume().unwrap();
        assert!(!thread.is_done());
        drop(thread);

        let stream = escaped.borrow_mut().take().unwrap();
        let (length, bytes) = stream
            .run(|stream| async move { (stream.length().await, stream.byte_array().await) })
            .unwrap();
        assert_eq!(length, 4);
        assert_eq!(bytes, b"abcd");
    }

    #[test]
    fn test_run_rejects_chain_still_being_fed() {
        let escaped = Rc::new(RefCell::new(None));
        let mut thread = ParserThread::new("doc", escaping(&escaped, true));
        thread.append(b"ab".to_vec()).unwrap();
        thread.resume().unwrap();

        let stream = escaped.borrow_mut().take().unwrap();
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        let result = stream.clone().run(move |_stream| async move { flag.set(true) });
        assert!(matches!(result, Err(StreamError::Incomplete)));
        assert!(!ran.get());

        thread.finish().unwrap();
        thread.resume().unwrap();
        assert_eq!(stream.run(|stream| async move { stream.length().await }).unwrap(), 2);
    }

    #[test]
    fn test_run_over_complete_input() {
        let stream = Stream::from_bytes("doc", b"%PDF-1.7".to_vec());
        let version = stream
            .run(|stream| async move {
                match stream.skip_maybe(5).await {
                    Some(rest) => Some(rest.byte_array().await),
                    None => None,
                }
            })
            .unwrap();
        assert_eq!(version.as_deref(), Some(&b"1.7"[..]));

        let empty = Stream::empty().run(|mut stream| async move { stream.is_empty().await });
        assert!(empty.unwrap());
    }

    #[test]
    fn test_parser_stream_shares_thread_name() {
        let seen: Shared<Option<Rc<[u8]>>> = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        let mut thread = ParserThread::new("doc.pdf", move |stream| async move {
            *sink.borrow_mut() = Some(stream.name_rc());
        });
        thread.resume().unwrap();

        let name = seen.borrow_mut().take().unwrap();
        assert!(Rc::ptr_eq(&name, &thread.name));
        assert_eq!(thread.name(), b"doc.pdf");
    }

    #[test]
    fn test_mixed_deleter_forms() {
        let shared = Rc::new(Cell::new(0));
        let owned = Rc::new(Cell::new(0));
        let counter = shared.clone();
        let mut thread = ParserThread::with_deleter(
            "doc",
            move |_: &[u8]| counter.set(counter.get() + 1),
            |_stream| async {},
        );

        thread.append(b"a".to_vec()).unwrap();
        let counter = owned.clone();
        thread
            .append_deleter(b"b".to_vec(), Deleter::owned(move || counter.set(counter.get() + 1)))
            .unwrap();
        thread.append(b"c".to_vec()).unwrap();
        drop(thread);

        assert_eq!(shared.get(), 2);
        assert_eq!(owned.get(), 1);
    }

    // ==================== feed_from tests ====================

    #[test]
    fn test_feed_from_small_reads() {
        let out = Rc::new(RefCell::new(Vec::new()));
        let config = ParserThreadConfig {
            read_buffer_size: 3,
            ..Default::default()
        };
        let mut thread = ParserThread::with_config("doc", config, collector(&out));
        thread.feed_from(Cursor::new(b"%PDF-1.7\n%%EOF".to_vec())).unwrap();

        assert!(thread.is_done());
        assert_eq!(&*out.borrow(), b"%PDF-1.7\n%%EOF");
    }

    #[test]
    fn test_feed_from_stops_when_parser_done() {
        let seen = Rc::new(Cell::new(false));
        let flag = seen.clone();
        let config = ParserThreadConfig {
            read_buffer_size: 2,
            ..Default::default()
        };
        let mut thread = ParserThread::with_config("doc", config, move |stream| async move {
            flag.set(stream.has_prefix(b"%P").await);
        });

        let mut source = Cursor::new(b"%PDF".to_vec());
        thread.feed_from(&mut source).unwrap();
        assert!(thread.is_done());
        assert!(seen.get());
        assert_eq!(source.position(), 2);
    }

    struct Flaky {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::new(ErrorKind::Interrupted, "again"));
            }
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_feed_from_retries_interrupted() {
        let out = Rc::new(RefCell::new(Vec::new()));
        let mut thread = ParserThread::new("doc", collector(&out));
        let reader = Flaky {
            interrupted: false,
            inner: Cursor::new(b"data".to_vec()),
        };
        thread.feed_from(reader).unwrap();
        assert_eq!(&*out.borrow(), b"data");
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::BrokenPipe, "gone"))
        }
    }

    #[test]
    fn test_feed_from_propagates_io_error() {
        let mut thread = ParserThread::new("doc", |_stream| async {});
        assert!(matches!(thread.feed_from(Broken), Err(StreamError::Io(_))));
    }

    #[test]
    fn test_debug_output() {
        let thread = ParserThread::new("doc", |_stream| async {});
        let debug = format!("{:?}", thread);
        assert!(debug.contains("ParserThread"));
        assert!(debug.contains("done: false"));
        assert_eq!(thread.name(), b"doc");
    }
}
