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

//! Error types for the input engine.
//!
//! Only operations that can be misused by the driver report errors. Running
//! out of bytes is never an error: stream reads answer it with plain values
//! (`bool`, `Option`, remaining counts) that parser code branches on.
//!
//! # Error Categories
//!
//! - **I/O Errors**: Problems reading a file or a feed source
//! - **Lifecycle Errors**: Driving a parser that has already returned
//! - **Chain Errors**: Extending a chain that is finished or was built complete,
//!   or running synchronously over one that is still being fed
//!
//! # Error Handling Examples
//!
//! ```rust
//! use feedstream::{ParserThread, StreamError};
//!
//! let mut thread = ParserThread::new("doc", |_stream| async {});
//! thread.resume().unwrap();
//! assert!(thread.is_done());
//!
//! match thread.append(b"late".to_vec()) {
//!     Err(StreamError::ParserDone) => {}
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

use thiserror::Error;

/// Errors reported by driver-facing operations.
///
/// # Examples
///
/// ```rust
/// use feedstream::StreamError;
///
/// let err = StreamError::Finished;
/// assert!(err.is_invalid_operation());
/// assert!(format!("{}", err).contains("finished"));
/// ```
#[derive(Error, Debug)]
pub enum StreamError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The parser callback has already returned.
    #[error("Parser has already finished running")]
    ParserDone,

    /// End of data was already declared for this stream.
    #[error("Stream is finished, no more data can be added")]
    Finished,

    /// The chain was built from a complete byte array and cannot grow.
    #[error("Stream data is not extensible")]
    NotExtensible,

    /// A synchronous run was asked to read a chain that is still being fed.
    #[error("Stream data is incomplete, its parser thread is still running")]
    Incomplete,
}

impl StreamError {
    /// Check whether this error is a misuse of the driver API rather than
    /// a failure of the environment.
    #[inline]
    pub fn is_invalid_operation(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;
