use std::fmt;

pub type ChunkCallback = Box<dyn FnMut(&str) -> String + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkMode {
    /// Each callback result is appended to the accumulator.
    #[default]
    Append,
    /// Each callback result replaces the accumulator.
    Replace,
}

impl SinkMode {
    pub fn from_append(append: bool) -> Self {
        if append { SinkMode::Append } else { SinkMode::Replace }
    }
}

pub struct StreamSink {
    callback: ChunkCallback,
    mode: SinkMode,
    accumulator: String,
    // trailing bytes of an incomplete UTF-8 sequence from the previous push
    pending: Vec<u8>,
    chunks: usize,
}

impl StreamSink {
    pub fn new<F>(callback: F, mode: SinkMode) -> Self
    where
        F: FnMut(&str) -> String + Send + 'static,
    {
        Self {
            callback: Box::new(callback),
            mode,
            accumulator: String::new(),
            pending: Vec::new(),
            chunks: 0,
        }
    }

    pub fn mode(&self) -> SinkMode {
        self.mode
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn reset(&mut self) {
        self.accumulator.clear();
        self.pending.clear();
        self.chunks = 0;
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        let decoded = std::str::from_utf8(&self.pending).map(str::len);
        let valid = match decoded {
            Ok(len) => len,
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            // invalid in the middle: decode lossily rather than stall
            Err(_) => {
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                self.push(&text);
                return;
            }
        };
        if valid == 0 {
            return;
        }
        let rest = self.pending.split_off(valid);
        let head = std::mem::replace(&mut self.pending, rest);
        let text = String::from_utf8_lossy(&head).into_owned();
        self.push(&text);
    }

    pub fn push(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        let out = (self.callback)(chunk);
        self.chunks += 1;
        match self.mode {
            SinkMode::Append => self.accumulator.push_str(&out),
            SinkMode::Replace => self.accumulator = out,
        }
    }

    pub fn finish(&mut self) -> String {
        if !self.pending.is_empty() {
            let tail = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            self.push(&tail);
        }
        self.chunks = 0;
        std::mem::take(&mut self.accumulator)
    }
}

impl fmt::Debug for StreamSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSink")
            .field("mode", &self.mode)
            .field("accumulated", &self.accumulator.len())
            .field("chunks", &self.chunks)
            .finish()
    }
}
