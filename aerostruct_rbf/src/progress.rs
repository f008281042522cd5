/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines progress reporting messages, sinks, and helper functions for operator builds.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Progress reporting primitives.
//!
//! Building an interpolation operator is the only expensive step of a
//! transfer. Builders and the operator cache report what they did through an
//! optional [`ProgressSink`]; nothing is printed or logged otherwise.

use std::fmt::Debug;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

/// Progress events emitted while building or looking up operators.
#[derive(Debug, Clone)]
pub enum ProgressMsg {
    /// Event indicating that repeated source points were removed.
    DuplicatesRemoved { num_duplicates: usize },

    /// The source cloud does not span three dimensions, so only `rank`
    /// of the `full_rank` polynomial terms were kept.
    ReducedPolynomialBasis { rank: usize, full_rank: usize },

    /// An interpolation operator was assembled.
    OperatorBuilt {
        num_source: usize,
        num_target: usize,
        kernel: String,
        epsilon: f64,
        elapsed: Duration,
    },

    /// A cached operator was reused.
    CacheHit { key: u64 },

    /// No cached operator matched and a new one is being built.
    CacheMiss { key: u64 },

    /// Arbitrary informational message.
    Message { message: String },
}

/// Sink that consumes progress messages.
pub trait ProgressSink: Send + Sync + Debug {
    fn emit(&self, msg: ProgressMsg);
}

/// Progress sink that forwards messages over a channel.
#[derive(Debug)]
pub struct ClosureSink {
    tx: mpsc::SyncSender<ProgressMsg>,
}

impl ProgressSink for ClosureSink {
    #[inline]
    fn emit(&self, msg: ProgressMsg) {
        let _ = self.tx.try_send(msg);
    }
}

/// Spawns a listener thread that runs a handler closure for each progress message.
///
/// Messages are dropped rather than blocking the caller when the buffer is full.
/// The listener exits once every clone of the returned sink has been dropped.
pub fn closure_sink<F>(
    buffer: usize,
    mut handler: F,
) -> (Arc<dyn ProgressSink>, thread::JoinHandle<()>)
where
    F: FnMut(ProgressMsg) + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel::<ProgressMsg>(buffer.max(1));
    let sink: Arc<dyn ProgressSink> = Arc::new(ClosureSink { tx });

    let handle = thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            handler(msg);
        }
    });

    (sink, handle)
}

/// Emits `msg` if a sink is attached.
#[inline]
pub(crate) fn emit(sink: &Option<Arc<dyn ProgressSink>>, msg: impl FnOnce() -> ProgressMsg) {
    if let Some(sink) = sink {
        sink.emit(msg());
    }
}
