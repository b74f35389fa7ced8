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

//! Streams over files.

use crate::error::StreamResult;
use crate::stream::Stream;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a whole file and return a complete stream over its contents.
///
/// The stream is named after the path.
///
/// # Errors
///
/// Returns [`StreamError::Io`](crate::StreamError::Io) if the file cannot
/// be read.
///
/// # Examples
///
/// ```rust,no_run
/// use feedstream::input_from_file;
///
/// let stream = input_from_file("document.pdf")?;
/// assert_eq!(stream.name(), b"document.pdf");
/// # Ok::<(), feedstream::StreamError>(())
/// ```
pub fn input_from_file(path: impl AsRef<Path>) -> StreamResult<Stream> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), len = bytes.len(), "loaded input file");
    Ok(Stream::from_bytes(path.display().to_string(), bytes))
}
