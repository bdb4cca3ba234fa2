//! Bridge UART link
//!
//! Frames in both directions over the buffered UART. Reads never wait:
//! the clock task drains whatever the interrupt handler has buffered
//! between pulses.

use defmt::*;
use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};
use embedded_io::{Read, ReadReady, Write};

use escapement_protocol::{ClockMessage, Frame, FrameError, FrameParser, MAX_FRAME_SIZE};

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum LinkError {
    Frame(FrameError),
    Uart,
}

impl From<FrameError> for LinkError {
    fn from(e: FrameError) -> Self {
        LinkError::Frame(e)
    }
}

/// Framed link to the network bridge
pub struct BridgeLink {
    tx: BufferedUartTx,
    rx: BufferedUartRx,
    parser: FrameParser,
    buf: [u8; RX_BUF_SIZE],
    len: usize,
    pos: usize,
}

impl BridgeLink {
    pub fn new(tx: BufferedUartTx, rx: BufferedUartRx) -> Self {
        Self {
            tx,
            rx,
            parser: FrameParser::new(),
            buf: [0; RX_BUF_SIZE],
            len: 0,
            pos: 0,
        }
    }

    /// Next complete frame from the bridge, or `None` once the receive
    /// buffer is drained
    pub fn next_frame(&mut self) -> Option<Result<Frame, LinkError>> {
        loop {
            while self.pos < self.len {
                let byte = self.buf[self.pos];
                self.pos += 1;
                match self.parser.push(byte) {
                    Ok(Some(frame)) => return Some(Ok(frame)),
                    Ok(None) => {}
                    Err(e) => return Some(Err(e.into())),
                }
            }

            match self.rx.read_ready() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    warn!("UART error: {:?}", e);
                    return Some(Err(LinkError::Uart));
                }
            }

            match self.rx.read(&mut self.buf) {
                Ok(0) => return None,
                Ok(n) => {
                    trace!("RX: {} bytes", n);
                    self.len = n;
                    self.pos = 0;
                }
                Err(e) => {
                    warn!("UART read error: {:?}", e);
                    return Some(Err(LinkError::Uart));
                }
            }
        }
    }

    pub fn send(&mut self, message: &ClockMessage<'_>) -> Result<(), LinkError> {
        let frame = message.to_frame()?;
        let mut out = [0u8; MAX_FRAME_SIZE];
        let len = frame.encode(&mut out)?;
        self.tx.write_all(&out[..len]).map_err(|_| LinkError::Uart)
    }
}
