use std::io::Cursor;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

use crate::common::{ErrorKind, Result};
use crate::protocol::{Frame, FrameError, Request};

pub struct Connection<T = TcpStream> {
    stream: BufWriter<T>,
    // The buffer for reading frames.
    buffer: BytesMut,
    // The buffer for encoding outgoing frames.
    write_buffer: BytesMut,
}

impl<T> Connection<T>
where
    T: AsyncWrite + AsyncRead + Unpin,
{
    pub(crate) fn new(stream: T, buffer_size: Option<usize>) -> Self {
        let buffer_size = buffer_size.unwrap_or(4 * 1024);
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(buffer_size),
            write_buffer: BytesMut::with_capacity(buffer_size),
        }
    }

    pub(crate) async fn write_request(&mut self, request: &Request) -> Result<()> {
        self.write_buffer.clear();
        request.encode(&mut self.write_buffer);
        self.flush_write_buffer().await
    }

    // Write any frame. used when playing the server role.
    #[cfg(test)]
    pub(crate) async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.write_buffer.clear();
        frame.encode(&mut self.write_buffer);
        self.flush_write_buffer().await
    }

    async fn flush_write_buffer(&mut self) -> Result<()> {
        self.stream.write_all(&self.write_buffer).await?;
        self.stream.flush().await?;
        Ok(())
    }

    // Read next frame. return None if the peer closed the connection cleanly.
    pub(crate) async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(ErrorKind::ConnectionResetByPeer.into())
                };
            }
        }
    }

    fn parse_frame(&mut self) -> Result<Option<Frame>> {
        let mut buf = Cursor::new(&self.buffer[..]);

        match Frame::check(&mut buf) {
            Ok(_) => {
                let len = buf.position() as usize;
                buf.set_position(0);
                let frame = Frame::parse(&mut buf)?;
                self.buffer.advance(len);

                Ok(Some(frame))
            }
            Err(FrameError::Incomplete) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl From<FrameError> for crate::Error {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Incomplete => ErrorKind::NetworkFraming("incomplete frame".into()).into(),
            FrameError::Invalid(description) => ErrorKind::NetworkFraming(description).into(),
        }
    }
}
