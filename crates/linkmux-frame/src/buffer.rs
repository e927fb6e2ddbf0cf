use std::collections::TryReserveError;

/// Fixed-capacity receive buffer with a fill cursor.
///
/// Bytes `[0, len)` are valid; the tail `[len, capacity)` is where the next
/// raw read lands. The capacity never changes after construction, so a peer
/// can never make a channel allocate more memory.
#[derive(Debug)]
pub struct RxBuffer {
    data: Box<[u8]>,
    fill_len: usize,
}

impl RxBuffer {
    /// Allocate a zeroed buffer of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            fill_len: 0,
        }
    }

    /// Allocate a zeroed buffer, reporting allocation failure instead of aborting.
    pub fn try_new(capacity: usize) -> std::result::Result<Self, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)?;
        data.resize(capacity, 0);
        Ok(Self {
            data: data.into_boxed_slice(),
            fill_len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.fill_len
    }

    pub fn is_empty(&self) -> bool {
        self.fill_len == 0
    }

    pub fn is_full(&self) -> bool {
        self.fill_len == self.data.len()
    }

    /// Free space at the tail.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.fill_len
    }

    /// The buffered bytes.
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.fill_len]
    }

    /// Writable tail for a raw read. Call [`RxBuffer::commit`] afterwards.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.fill_len..]
    }

    /// Mark `n` bytes of the tail as filled. Clamped to the free space.
    pub fn commit(&mut self, n: usize) {
        debug_assert!(n <= self.remaining(), "commit past capacity");
        self.fill_len += n.min(self.remaining());
    }

    /// Copy as much of `bytes` as fits and return how many were taken.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.remaining());
        self.data[self.fill_len..self.fill_len + n].copy_from_slice(&bytes[..n]);
        self.fill_len += n;
        n
    }

    /// Drop `n` bytes from the front and slide the rest down to offset 0.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.fill_len);
        if n == 0 {
            return;
        }
        self.data.copy_within(n..self.fill_len, 0);
        self.fill_len -= n;
    }

    pub fn clear(&mut self) {
        self.fill_len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_stops_at_capacity() {
        let mut buf = RxBuffer::new(4);
        assert_eq!(buf.extend_from_slice(b"abcdef"), 4);
        assert!(buf.is_full());
        assert_eq!(buf.filled(), b"abcd");
        assert_eq!(buf.extend_from_slice(b"x"), 0);
        assert_eq!(buf.filled(), b"abcd");
    }

    #[test]
    fn consume_compacts_to_front() {
        let mut buf = RxBuffer::new(8);
        buf.extend_from_slice(b"hello");
        buf.consume(2);
        assert_eq!(buf.filled(), b"llo");
        assert_eq!(buf.remaining(), 5);

        buf.consume(10);
        assert!(buf.is_empty());
    }

    #[test]
    fn spare_and_commit() {
        let mut buf = RxBuffer::new(6);
        buf.extend_from_slice(b"ab");
        let spare = buf.spare_mut();
        assert_eq!(spare.len(), 4);
        spare[..3].copy_from_slice(b"cde");
        buf.commit(3);
        assert_eq!(buf.filled(), b"abcde");
    }

    #[test]
    fn try_new_allocates_requested_capacity() {
        let buf = RxBuffer::try_new(1024).unwrap();
        assert_eq!(buf.capacity(), 1024);
        assert!(buf.is_empty());
    }

    #[test]
    fn try_new_reports_impossible_allocation() {
        assert!(RxBuffer::try_new(usize::MAX).is_err());
    }
}
