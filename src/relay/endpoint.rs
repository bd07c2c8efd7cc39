//! Remote endpoint descriptors and the rotating pool that picks between them.

use serde::Deserialize;
use std::sync::Mutex;
use tracing::{debug, info};

/// Request body layout expected by a remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    /// Structured conversation fields (prior user inputs plus the new text).
    Conversational,
    /// Flat prompt plus generation parameters.
    Prompt,
}

impl PayloadShape {
    /// Infer the shape from the endpoint URL. DialoGPT models take the
    /// conversational layout; everything else gets a flat prompt.
    pub fn infer(url: &str) -> Self {
        if url.contains("DialoGPT") {
            PayloadShape::Conversational
        } else {
            PayloadShape::Prompt
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub url: String,
    pub shape: PayloadShape,
}

impl EndpointDescriptor {
    pub fn new(url: impl Into<String>, shape: PayloadShape) -> Self {
        Self { url: url.into(), shape }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let shape = PayloadShape::infer(&url);
        Self { url, shape }
    }
}

/// Ordered endpoints plus the cursor selecting the next one to try.
///
/// The cursor is always in `[0, len)`; rotation wraps.
pub struct EndpointPool {
    endpoints: Vec<EndpointDescriptor>,
    cursor: Mutex<usize>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct EmptyPool;

impl std::fmt::Display for EmptyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "endpoint pool needs at least one endpoint")
    }
}

impl std::error::Error for EmptyPool {}

impl EndpointPool {
    pub fn new(endpoints: Vec<EndpointDescriptor>) -> Result<Self, EmptyPool> {
        if endpoints.is_empty() {
            return Err(EmptyPool);
        }
        Ok(Self {
            endpoints,
            cursor: Mutex::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn cursor(&self) -> usize {
        *self.lock()
    }

    /// The endpoint under the cursor.
    pub fn current(&self) -> &EndpointDescriptor {
        let idx = *self.lock();
        &self.endpoints[idx]
    }

    /// The cursor position and a copy of its endpoint, read under one lock.
    pub fn checkout(&self) -> (usize, EndpointDescriptor) {
        let idx = *self.lock();
        (idx, self.endpoints[idx].clone())
    }

    /// Move past `failed` if the cursor still points at it, wrapping at the end.
    /// A stale index (another caller already rotated) leaves the cursor alone.
    /// Returns the cursor position afterwards.
    pub fn advance_from(&self, failed: usize) -> usize {
        let mut cursor = self.lock();
        if *cursor != failed {
            debug!("Endpoint {failed} already rotated away (cursor at {})", *cursor);
            return *cursor;
        }
        *cursor = (*cursor + 1) % self.endpoints.len();
        info!("🔁 Rotated to endpoint {} ({})", *cursor, self.endpoints[*cursor].url);
        *cursor
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, usize> {
        // The guarded value is a plain index, so a poisoned lock is still usable.
        self.cursor.lock().unwrap_or_else(|e| e.into_inner())
    }
}
