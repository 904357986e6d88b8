//! Ordered-parallel frame writing.
//!
//! [`SeekableWriter::write_many`] compresses frames on a bounded pool of
//! worker threads while keeping the output stream and the seek table in
//! frame-source order. Ordering is preserved with a promise queue: for
//! every frame pulled from the source, the producer enqueues a single-slot
//! channel before dispatching the compression job, and a single consumer
//! awaits those channels strictly in queue order. Compression may finish
//! out of order; the written stream never does, and is byte-identical to
//! what serial [`SeekableWriter::write`] calls over the same frames would
//! produce.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::debug;

use crate::encoder::encode_frame;
use crate::env::WriteEnvironment;
use crate::error::{Error, Result};
use crate::format::SeekTableEntry;
use crate::writer::SeekableWriter;

type EncodeResult = Result<(Vec<u8>, SeekTableEntry)>;
type Promise = Receiver<EncodeResult>;
type Job = (Vec<u8>, SyncSender<EncodeResult>);

/// Options for [`SeekableWriter::write_many`].
pub struct WriteManyOptions<'a> {
    concurrency: Option<usize>,
    progress: Option<Box<dyn FnMut(u32) + Send + 'a>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> WriteManyOptions<'a> {
    /// Default options: one compression worker per available CPU, no
    /// progress callback, no cancellation flag.
    pub fn new() -> Self {
        Self {
            concurrency: None,
            progress: None,
            cancel: None,
        }
    }

    /// Number of compression workers. Must be at least 1;
    /// [`write_many`](SeekableWriter::write_many) rejects 0.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Callback invoked with each frame's decompressed size as it is
    /// committed to the sink, in output order.
    pub fn with_progress(mut self, progress: impl FnMut(u32) + Send + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// A shared flag that cancels the pipeline when set. Pending work is
    /// abandoned; in-flight compressions complete but their results are
    /// discarded.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }
}

impl Default for WriteManyOptions<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> SeekableWriter<E>
where
    E: WriteEnvironment + Send,
{
    /// Compress and write many frames concurrently, preserving source
    /// order in the output.
    ///
    /// `frame_source` is called from the current thread and returns one
    /// frame at a time, `Ok(None)` once exhausted, or an error, which
    /// cancels the pipeline and is returned wrapped as [`Error::Source`].
    /// Any pipeline failure (compression, sink write, cancellation)
    /// likewise stops the producer and workers promptly.
    ///
    /// The stream is not finalized: call [`close`](SeekableWriter::close)
    /// (or keep writing) afterwards, exactly as with serial writes.
    pub fn write_many<S>(&mut self, mut frame_source: S, options: WriteManyOptions<'_>) -> Result<()>
    where
        S: FnMut() -> std::result::Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>>,
    {
        let concurrency = match options.concurrency {
            Some(0) => return Err(Error::BadConcurrency { concurrency: 0 }),
            Some(concurrency) => concurrency,
            None => thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        };

        let level = self.encoder.level();
        let env = &mut self.env;
        let entries = self.encoder.entries_mut();

        let failed = AtomicBool::new(false);
        let failed = &failed;
        let cancel = options.cancel;
        let cancel = &cancel;
        let cancelled = move || cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Acquire));
        let mut progress = options.progress;

        let (producer_result, consumer_result) = thread::scope(|scope| {
            // Extra room in the promise queue keeps throughput high even
            // when frames finish compressing out of order.
            let (queue_tx, queue_rx) = mpsc::sync_channel::<Promise>(concurrency * 2);
            let (job_tx, job_rx) = mpsc::sync_channel::<Job>(concurrency);
            let job_rx = Arc::new(Mutex::new(job_rx));

            for _ in 0..concurrency {
                let job_rx = Arc::clone(&job_rx);
                scope.spawn(move || loop {
                    let job = job_rx.lock().expect("job queue lock poisoned").recv();
                    match job {
                        Ok((frame, promise)) => {
                            // Fulfill the promise. A send error means the
                            // pipeline is tearing down and the result is
                            // discarded.
                            let _ = promise.send(encode_frame(level, &frame));
                        }
                        Err(_) => break,
                    }
                });
            }

            let consumer = scope.spawn(move || -> Result<()> {
                loop {
                    if cancelled() {
                        failed.store(true, Ordering::Release);
                        return Err(Error::Cancelled);
                    }
                    if failed.load(Ordering::Acquire) {
                        // A peer failed; abandon the queue.
                        return Ok(());
                    }

                    let promise = match queue_rx.recv() {
                        Ok(promise) => promise,
                        // Producer hung up and the queue is drained.
                        Err(_) => return Ok(()),
                    };
                    let (dst, entry) = match promise.recv() {
                        Ok(Ok(result)) => result,
                        Ok(Err(err)) => {
                            failed.store(true, Ordering::Release);
                            return Err(err);
                        }
                        Err(_) => {
                            // The compression job behind this promise was
                            // dropped before running.
                            failed.store(true, Ordering::Release);
                            return Err(Error::Cancelled);
                        }
                    };

                    let n = match env.write_frame(&dst) {
                        Ok(n) => n,
                        Err(err) => {
                            failed.store(true, Ordering::Release);
                            return Err(err);
                        }
                    };
                    if n != dst.len() {
                        failed.store(true, Ordering::Release);
                        return Err(Error::PartialWrite {
                            written: n,
                            expected: dst.len(),
                        });
                    }

                    debug!(
                        comp_size = entry.comp_size,
                        decomp_size = entry.decomp_size,
                        "appending frame"
                    );
                    entries.push(entry);
                    if let Some(progress) = progress.as_mut() {
                        progress(entry.decomp_size);
                    }
                }
            });

            let mut produce = || -> Result<()> {
                loop {
                    if cancelled() {
                        failed.store(true, Ordering::Release);
                        return Err(Error::Cancelled);
                    }
                    if failed.load(Ordering::Acquire) {
                        return Ok(());
                    }

                    let frame = match frame_source() {
                        Ok(frame) => frame,
                        Err(err) => {
                            failed.store(true, Ordering::Release);
                            return Err(Error::Source(err));
                        }
                    };
                    let Some(frame) = frame else {
                        return Ok(());
                    };
                    // Empty frames are no-ops, exactly as with serial writes.
                    if frame.is_empty() {
                        continue;
                    }

                    // Enqueue the promise before dispatching the job, so
                    // the consumer sees promises in frame-source order no
                    // matter how compression interleaves.
                    let (promise_tx, promise_rx) = mpsc::sync_channel::<EncodeResult>(1);
                    if queue_tx.send(promise_rx).is_err() {
                        return Ok(());
                    }
                    if job_tx.send((frame, promise_tx)).is_err() {
                        return Ok(());
                    }
                }
            };
            let producer_result = produce();

            // Hang up so workers and the consumer wind down once the
            // remaining promises are resolved or abandoned.
            drop(job_tx);
            drop(queue_tx);

            let consumer_result = consumer.join().expect("frame consumer thread panicked");
            (producer_result, consumer_result)
        });

        producer_result.and(consumer_result)
    }
}
