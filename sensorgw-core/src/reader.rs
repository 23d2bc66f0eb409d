//! Bounds-checked little-endian cursor over a frame payload.
//!
//! `bytes::Buf` panics when it runs out of data; every read here checks
//! `remaining()` first and reports a [`GatewayError::Truncated`] instead.

use bytes::Buf;

use crate::error::GatewayError;

pub struct PayloadReader<'a> {
    buf: &'a [u8],
    len: usize,
    context: &'static str,
}

impl<'a> PayloadReader<'a> {
    /// `context` names the message in truncation errors.
    pub fn new(buf: &'a [u8], context: &'static str) -> Self {
        Self {
            buf,
            len: buf.len(),
            context,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.len - self.buf.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<(), GatewayError> {
        if self.buf.remaining() < needed {
            return Err(GatewayError::truncated(
                self.context,
                needed,
                self.buf.remaining(),
            ));
        }
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8, GatewayError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn i8(&mut self) -> Result<i8, GatewayError> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn bool(&mut self) -> Result<bool, GatewayError> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> Result<u16, GatewayError> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn i16(&mut self) -> Result<i16, GatewayError> {
        self.ensure(2)?;
        Ok(self.buf.get_i16_le())
    }

    pub fn u32(&mut self) -> Result<u32, GatewayError> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn u64(&mut self) -> Result<u64, GatewayError> {
        self.ensure(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn f32(&mut self) -> Result<f32, GatewayError> {
        self.ensure(4)?;
        Ok(self.buf.get_f32_le())
    }
}
