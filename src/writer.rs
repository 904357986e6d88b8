//! Writing seekable zstd streams, one frame per write.

use crate::encoder::SeekableEncoder;
use crate::env::{WriteEnvironment, WriteSink};
use crate::error::{Error, Result};

/// A writer producing a seekable zstd stream.
///
/// Each [`write`](Self::write) maps one input buffer to one zstd frame; no
/// coalescing or splitting is performed, so the caller chooses the frame
/// granularity (and with it the random-access granularity of the resulting
/// stream). [`close`](Self::close) emits the seek table as the final
/// skippable frame; the underlying sink remains the caller's to close.
pub struct SeekableWriter<E>
where
    E: WriteEnvironment,
{
    pub(crate) env: E,
    pub(crate) encoder: SeekableEncoder,
    closed: bool,
}

impl<W> SeekableWriter<WriteSink<W>>
where
    W: std::io::Write,
{
    /// Start building a writer over a byte sink.
    pub fn builder(sink: W) -> SeekableWriterBuilder<WriteSink<W>> {
        SeekableWriterBuilder::from_environment(WriteSink::new(sink))
    }
}

impl<E> SeekableWriter<E>
where
    E: WriteEnvironment,
{
    /// Compress `src` as a single frame and write it to the environment.
    ///
    /// Returns the number of uncompressed bytes ingested (`src.len()`),
    /// not the number of compressed bytes emitted. An empty `src` is a
    /// no-op returning 0.
    pub fn write(&mut self, src: &[u8]) -> Result<usize> {
        let dst = self.encoder.encode(src)?;
        if dst.is_empty() {
            return Ok(0);
        }

        let n = self.env.write_frame(&dst)?;
        if n != dst.len() {
            return Err(Error::PartialWrite {
                written: n,
                expected: dst.len(),
            });
        }
        Ok(src.len())
    }

    /// Serialize the seek table, emit it as the stream's final skippable
    /// frame, and drop the entry list.
    ///
    /// Only the first call does any work; later calls return `Ok(())`. A
    /// writer that never wrote a frame still emits a well-formed seek
    /// table with a frame count of zero.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let table = self.encoder.end_stream()?;
        self.encoder.entries_mut().clear();

        let n = self.env.write_seek_table(&table)?;
        if n != table.len() {
            return Err(Error::PartialWrite {
                written: n,
                expected: table.len(),
            });
        }
        Ok(())
    }
}

impl<E> std::io::Write for SeekableWriter<E>
where
    E: WriteEnvironment,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(SeekableWriter::write(self, buf)?)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        // Frames are written whole as they are compressed; there is
        // nothing buffered to flush.
        Ok(())
    }
}

impl<E> Drop for SeekableWriter<E>
where
    E: WriteEnvironment,
{
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Builder for [`SeekableWriter`].
pub struct SeekableWriterBuilder<E> {
    env: E,
    compression_level: i32,
}

impl<E> SeekableWriterBuilder<E>
where
    E: WriteEnvironment,
{
    /// Start building a writer over a custom [`WriteEnvironment`].
    pub fn from_environment(env: E) -> Self {
        Self {
            env,
            compression_level: 0,
        }
    }

    /// Set the zstd compression level. Level 0 uses zstd's default.
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Build the writer.
    pub fn build(self) -> SeekableWriter<E> {
        SeekableWriter {
            env: self.env,
            encoder: SeekableEncoder::new(self.compression_level),
            closed: false,
        }
    }
}
