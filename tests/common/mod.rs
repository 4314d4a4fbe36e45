//! Shared helpers for the integration tests: a concrete peer protocol
//! (the real payload format lives outside this crate) and logger setup.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use netplay_transport::{PeerProtocol, ProtocolError};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Length-prefixed test protocol: every message is serialized as a u16
/// big-endian length followed by that many payload bytes, and a datagram
/// carries zero or more messages back to back.
#[derive(Default)]
pub struct TestProtocol {
    pending: VecDeque<Vec<u8>>,
}

impl PeerProtocol for TestProtocol {
    type Payload = Vec<u8>;

    fn queue(&mut self, payload: Vec<u8>) {
        self.pending.push_back(payload);
    }

    fn serialize(&mut self, sink: &mut [u8]) -> Result<usize, ProtocolError> {
        let mut written = 0;
        while let Some(front) = self.pending.front() {
            let required = 2 + front.len();
            if written + required > sink.len() {
                if written == 0 {
                    return Err(ProtocolError::SinkOverflow {
                        required,
                        capacity: sink.len(),
                    });
                }
                break;
            }
            sink[written..written + 2].copy_from_slice(&(front.len() as u16).to_be_bytes());
            sink[written + 2..written + required].copy_from_slice(front);
            written += required;
            self.pending.pop_front();
        }
        Ok(written)
    }

    fn decode(
        &mut self,
        source: &[u8],
        emit: &mut dyn FnMut(Vec<u8>),
    ) -> Result<(), ProtocolError> {
        let mut cursor = 0;
        while cursor < source.len() {
            if cursor + 2 > source.len() {
                return Err(ProtocolError::Malformed {
                    reason: "truncated length prefix",
                });
            }
            let length = u16::from_be_bytes([source[cursor], source[cursor + 1]]) as usize;
            cursor += 2;
            if cursor + length > source.len() {
                return Err(ProtocolError::Malformed {
                    reason: "truncated message body",
                });
            }
            emit(source[cursor..cursor + length].to_vec());
            cursor += length;
        }
        Ok(())
    }
}

/// How long [`StallingProtocol`] blocks inside decode.
pub const DECODE_STALL: Duration = Duration::from_millis(800);

/// A [`TestProtocol`] whose decode blocks for [`DECODE_STALL`] before
/// interpreting the datagram, used to verify that a slow decode does not
/// hold up the receive loop.
#[derive(Default)]
pub struct StallingProtocol {
    inner: TestProtocol,
}

impl PeerProtocol for StallingProtocol {
    type Payload = Vec<u8>;

    fn queue(&mut self, payload: Vec<u8>) {
        self.inner.queue(payload);
    }

    fn serialize(&mut self, sink: &mut [u8]) -> Result<usize, ProtocolError> {
        self.inner.serialize(sink)
    }

    fn decode(
        &mut self,
        source: &[u8],
        emit: &mut dyn FnMut(Vec<u8>),
    ) -> Result<(), ProtocolError> {
        std::thread::sleep(DECODE_STALL);
        self.inner.decode(source, emit)
    }
}
