//! Upload body that reports its own progress.
//!
//! Wraps the byte stream of one local file. The running count goes to the
//! file's [`UploadProgress`] at most once a second and once more at the end.
//! The request declares its `Content-Length` up front, so a file that comes
//! up short of the size it had when the upload started fails the body.

use super::progress::UploadProgress;
use bytes::Bytes;
use futures_util::Stream;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::time::{Duration, Instant};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

pub struct ProgressStream<S> {
    inner: S,
    progress: UploadProgress,
    transferred: u64,
    last_report: Instant,
    done: bool,
}

impl<S> ProgressStream<S>
where
    S: Stream<Item = Result<Bytes, io::Error>>,
{
    pub fn new(inner: S, progress: UploadProgress) -> Self {
        Self {
            inner,
            progress,
            transferred: 0,
            last_report: Instant::now(),
            done: false,
        }
    }

    pub fn progress(&self) -> &UploadProgress {
        &self.progress
    }

    fn report(&mut self) {
        let transferred = self.transferred;
        self.progress.update(transferred);
        self.last_report = Instant::now();
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = Result<Bytes, io::Error>> + Unpin,
{
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(bytes))) => {
                self.transferred += bytes.len() as u64;
                if self.last_report.elapsed() >= REPORT_INTERVAL {
                    self.report();
                }
                Poll::Ready(Some(Ok(bytes)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => {
                self.done = true;
                self.report();

                let expected = self.progress.total_bytes();
                if self.transferred < expected {
                    return Poll::Ready(Some(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "{} shrank during upload ({} of {} bytes)",
                            self.progress.name(),
                            self.transferred,
                            expected
                        ),
                    ))));
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
