use std::io::{self, Read, Seek, SeekFrom};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

/// A progress bar over a seekable reader.
///
/// The position of the bar is the current offset in the reader.
pub struct ReadProgress<R> {
    inner: R,
    progress_bar: ProgressBar,
}

impl<R> ReadProgress<R>
where
    R: Seek,
{
    pub fn new(mut read: R) -> io::Result<Self> {
        let len = read.seek(SeekFrom::End(0))? + 1;
        read.seek(SeekFrom::Start(0))?;
        let progress_bar = ProgressBar::new(len);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("[Time: {elapsed_precise}, ETA: {eta_precise}] {bar} {percent}% {msg}")
                .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?,
        );

        Ok(ReadProgress {
            inner: read,
            progress_bar,
        })
    }

    pub fn progress_bar(&self) -> &ProgressBar {
        &self.progress_bar
    }
}

impl<R> Read for ReadProgress<R>
where
    R: Read + Seek,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n_read = self.inner.read(buf)?;
        let pos = self.inner.stream_position()?;
        self.progress_bar.set_position(pos);
        Ok(n_read)
    }
}

impl<R> Drop for ReadProgress<R> {
    fn drop(&mut self) {
        self.progress_bar.finish();
    }
}

/// Measure the number of sentences processed per second.
///
/// The speed is logged when the instance is dropped.
pub struct SentenceSpeed {
    activity: &'static str,
    start: Instant,
    n_sentences: usize,
}

impl SentenceSpeed {
    /// Start measuring, `activity` describes what is done with sentences.
    pub fn new(activity: &'static str) -> Self {
        SentenceSpeed {
            activity,
            start: Instant::now(),
            n_sentences: 0,
        }
    }

    pub fn count_sentences(&mut self, n_sentences: usize) {
        self.n_sentences += n_sentences;
    }
}

impl Drop for SentenceSpeed {
    fn drop(&mut self) {
        let elapsed_secs = self.start.elapsed().as_secs_f32();
        log::info!(
            "{} {} sentences in {:.1}s ({:.1} sents/s)",
            self.activity,
            self.n_sentences,
            elapsed_secs,
            self.n_sentences as f32 / elapsed_secs
        );
    }
}
