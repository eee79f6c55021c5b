use crate::{Fault, Result, VmError};

/// Bytes in the shared code/data space.
pub const DATA_SIZE: usize = 0x1000;
/// Word slots in the stack. `sp == STACK_SLOTS` means the stack is empty.
pub const STACK_SLOTS: usize = 0x100;

/// Code/data bytes plus the word stack.
///
/// Every access is range-checked against the fixed extents above; nothing is
/// clamped or wrapped. Words are little-endian regardless of the host.
#[derive(Clone)]
pub struct AddressSpace {
    data: Vec<u8>,
    stack: [u16; STACK_SLOTS],
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressSpace")
            .field("data_len", &self.data.len())
            .field("stack_slots", &self.stack.len())
            .finish()
    }
}

impl AddressSpace {
    pub fn new() -> Self {
        Self {
            data: vec![0; DATA_SIZE],
            stack: [0; STACK_SLOTS],
        }
    }

    /// Copy a raw program image to offset 0. The rest of the data space is zeroed.
    pub fn load_image(&mut self, image: &[u8]) -> Result<()> {
        if image.len() > DATA_SIZE {
            return Err(VmError::ImageTooLarge {
                len: image.len(),
                capacity: DATA_SIZE,
            });
        }
        self.data.fill(0);
        self.data[..image.len()].copy_from_slice(image);
        Ok(())
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn read_byte(&self, addr: u16) -> std::result::Result<u8, Fault> {
        self.data
            .get(addr as usize)
            .copied()
            .ok_or(Fault::OutOfBoundsAddress { addr: addr as u32 })
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) -> std::result::Result<(), Fault> {
        let slot = self
            .data
            .get_mut(addr as usize)
            .ok_or(Fault::OutOfBoundsAddress { addr: addr as u32 })?;
        *slot = value;
        Ok(())
    }

    pub fn read_word(&self, addr: u16) -> std::result::Result<u16, Fault> {
        let range = Self::word_range(addr)?;
        Ok(u16::from_le_bytes([self.data[range.start], self.data[range.start + 1]]))
    }

    pub fn write_word(&mut self, addr: u16, value: u16) -> std::result::Result<(), Fault> {
        let range = Self::word_range(addr)?;
        self.data[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Both bytes of a word must be addressable; report the first one that is not.
    fn word_range(addr: u16) -> std::result::Result<std::ops::Range<usize>, Fault> {
        let start = addr as usize;
        if start >= DATA_SIZE {
            return Err(Fault::OutOfBoundsAddress { addr: start as u32 });
        }
        if start + 1 >= DATA_SIZE {
            return Err(Fault::OutOfBoundsAddress {
                addr: (start + 1) as u32,
            });
        }
        Ok(start..start + 2)
    }

    /// Push below `sp`. Pushing with `sp == 0` is an overflow and leaves everything untouched.
    pub fn push(&mut self, sp: &mut u16, value: u16) -> std::result::Result<(), Fault> {
        let slot = sp.checked_sub(1).ok_or(Fault::StackOverflow)?;
        let cell = self
            .stack
            .get_mut(slot as usize)
            .ok_or(Fault::StackOverflow)?;
        *cell = value;
        *sp = slot;
        Ok(())
    }

    pub fn pop(&self, sp: &mut u16) -> std::result::Result<u16, Fault> {
        let value = *self.stack.get(*sp as usize).ok_or(Fault::StackUnderflow)?;
        *sp += 1;
        Ok(value)
    }

    /// Up to `count` live stack entries starting at the top (`sp`).
    pub fn stack_window(&self, sp: u16, count: usize) -> &[u16] {
        let start = (sp as usize).min(STACK_SLOTS);
        let end = start.saturating_add(count).min(STACK_SLOTS);
        &self.stack[start..end]
    }

    /// Bytes from `addr` up to, not including, the first zero byte.
    pub fn read_cstr(&self, addr: u16) -> std::result::Result<&[u8], Fault> {
        let tail = self
            .data
            .get(addr as usize..)
            .filter(|tail| !tail.is_empty())
            .ok_or(Fault::OutOfBoundsAddress { addr: addr as u32 })?;
        let len = tail
            .iter()
            .position(|&byte| byte == 0)
            .ok_or(Fault::UnterminatedString { addr })?;
        Ok(&tail[..len])
    }

    /// Room for a NUL-terminated string at `addr`, terminator included.
    pub fn cstr_capacity(addr: u16) -> std::result::Result<usize, Fault> {
        DATA_SIZE
            .checked_sub(addr as usize)
            .filter(|&capacity| capacity > 0)
            .ok_or(Fault::OutOfBoundsAddress { addr: addr as u32 })
    }

    /// Store `bytes` followed by a zero byte. Nothing is written if it would not fit.
    pub fn write_cstr(&mut self, addr: u16, bytes: &[u8]) -> std::result::Result<(), Fault> {
        let capacity = Self::cstr_capacity(addr)?;
        if bytes.len() >= capacity {
            return Err(Fault::InputOverrun {
                addr,
                len: bytes.len(),
                capacity,
            });
        }
        let start = addr as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        self.data[start + bytes.len()] = 0;
        Ok(())
    }
}
