//! Append-only persistent logs
pub use sd::{SdError, SdStorage};

pub mod sd;

/// Terminator appended by the sinks after every line.
pub const LINE_ENDING: &str = "\r\n";

/// The two append-only streams kept on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    /// Lifecycle, valve and fault events
    Operational,
    /// One sensor record per cycle
    Data,
}

impl Stream {
    /// Name of the file backing the stream (8.3 compatible).
    pub fn file_name(&self) -> &'static str {
        match self {
            Stream::Operational => "log.csv",
            Stream::Data => "datalog.csv",
        }
    }
}

/// Storage that supports one open handle at a time.
pub trait StorageSink {
    type Handle;
    type Error;

    /// (Re)mount the volume. Called at boot and at the top of every cycle,
    /// since the card may have been reset while the system slept.
    fn init_volume(&mut self) -> Result<(), Self::Error>;

    /// Open the stream for appending, creating it if needed.
    fn open_append(&mut self, stream: Stream) -> Result<Self::Handle, Self::Error>;

    /// Write `line` followed by [`LINE_ENDING`].
    fn write_line(&mut self, handle: &mut Self::Handle, line: &str) -> Result<(), Self::Error>;

    /// Release the handle.
    fn close(&mut self, handle: Self::Handle) -> Result<(), Self::Error>;
}

/// Acquire a handle on `stream`, write exactly one line and release the
/// handle before returning, whatever the outcome of the write.
/// There is no retry: a failed line is simply missing from the log.
pub fn append_line<S: StorageSink>(sink: &mut S, stream: Stream, line: &str) -> Result<(), S::Error> {
    let mut handle = sink.open_append(stream)?;
    let written = sink.write_line(&mut handle, line);
    let closed = sink.close(handle);
    written.and(closed)
}
