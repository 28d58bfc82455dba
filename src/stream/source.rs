use crate::error::Result;

/// Pull-based byte reader the scanner and decoder work against.
///
/// Implementations hand out bytes one at a time and never need to hold
/// more than their current buffer, so arbitrarily large responses can be
/// walked in constant memory.
#[allow(async_fn_in_trait)]
pub trait ByteSource {
    /// Next byte, or `None` once the stream is exhausted
    async fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Skip bytes until one of `delimiters` is consumed and return it.
    /// Returns `None` if the stream ends first.
    async fn read_until(&mut self, delimiters: &[u8]) -> Result<Option<u8>> {
        while let Some(byte) = self.read_byte().await? {
            if delimiters.contains(&byte) {
                return Ok(Some(byte));
            }
        }
        Ok(None)
    }
}

/// In-memory source over a borrowed buffer
#[cfg(test)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

#[cfg(test)]
impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

#[cfg(test)]
impl ByteSource for SliceSource<'_> {
    async fn read_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.data.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }
}

/// Streams the body of an HTTP response one network chunk at a time.
///
/// Dropping the source drops the response and with it the connection.
pub struct ResponseSource {
    response: reqwest::Response,
    buf: Vec<u8>,
    pos: usize,
    done: bool,
}

impl ResponseSource {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            buf: Vec::new(),
            pos: 0,
            done: false,
        }
    }
}

impl ByteSource for ResponseSource {
    async fn read_byte(&mut self) -> Result<Option<u8>> {
        while self.pos >= self.buf.len() {
            if self.done {
                return Ok(None);
            }
            match self.response.chunk().await? {
                Some(chunk) => {
                    self.buf.clear();
                    self.buf.extend_from_slice(&chunk);
                    self.pos = 0;
                }
                None => self.done = true,
            }
        }

        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }
}
