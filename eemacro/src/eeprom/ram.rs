use core::convert::Infallible;

use heapless::Deque;

use super::Eeprom;

/// In-memory [`Eeprom`] with immediate durability.
///
/// Starts out erased (all `0xFF`). Useful as a scratch store and for unit
/// tests; panics on out-of-range addresses, so size it to cover the configured
/// region.
pub struct RamEeprom<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> RamEeprom<N> {
    pub fn new() -> Self {
        Self { data: [0xFF; N] }
    }

    pub fn from_image(data: [u8; N]) -> Self {
        Self { data }
    }

    pub fn image(&self) -> &[u8; N] {
        &self.data
    }
}

impl<const N: usize> Default for RamEeprom<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Eeprom for RamEeprom<N> {
    type Error = Infallible;

    fn read(&mut self, addr: u16) -> Result<u8, Self::Error> {
        Ok(self.data[addr as usize])
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), Self::Error> {
        self.data[addr as usize] = value;
        Ok(())
    }

    fn copy(&mut self, dst: u16, src: u16, len: u8) -> Result<(), Self::Error> {
        // Front-to-back, so a left-moving overlap copies the original bytes.
        for i in 0..len as usize {
            self.data[dst as usize + i] = self.data[src as usize + i];
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

const QUEUE_DEPTH: usize = 64;

#[derive(Clone, Copy, Debug)]
enum PendingOp {
    Write { addr: u16, value: u8 },
    Copy { dst: u16, src: u16, len: u8 },
}

/// In-memory [`Eeprom`] with deferred commits.
///
/// Mirrors the behavior of a real driver that queues writes and commits them
/// at idle points: operations land in a FIFO and are applied to the durable
/// image in submission order, while reads are served from a shadow image that
/// already includes every queued operation. When the FIFO is full the oldest
/// operation commits on its own, like a hardware queue draining under
/// pressure.
///
/// The partial-commit and power-loss hooks make interrupted write bursts
/// reproducible in tests.
pub struct QueuedEeprom<const N: usize> {
    committed: [u8; N],
    shadow: [u8; N],
    pending: Deque<PendingOp, QUEUE_DEPTH>,
}

impl<const N: usize> QueuedEeprom<N> {
    pub fn new() -> Self {
        Self {
            committed: [0xFF; N],
            shadow: [0xFF; N],
            pending: Deque::new(),
        }
    }

    /// Start from an existing durable image, with nothing pending.
    pub fn from_image(image: [u8; N]) -> Self {
        Self {
            committed: image,
            shadow: image,
            pending: Deque::new(),
        }
    }

    /// Current read view: the durable image plus all queued operations.
    pub fn image(&self) -> &[u8; N] {
        &self.shadow
    }

    /// The durable image: what survives a power loss right now.
    pub fn committed(&self) -> &[u8; N] {
        &self.committed
    }

    pub fn pending_ops(&self) -> usize {
        self.pending.len()
    }

    /// Commit the `n` oldest queued operations.
    pub fn commit_partial(&mut self, n: usize) {
        for _ in 0..n {
            self.commit_one();
        }
    }

    /// Drop every uncommitted operation, as a power loss would.
    pub fn lose_power(&mut self) {
        self.pending.clear();
        self.shadow = self.committed;
    }

    fn commit_one(&mut self) {
        if let Some(op) = self.pending.pop_front() {
            Self::apply(&mut self.committed, op);
        }
    }

    fn enqueue(&mut self, op: PendingOp) {
        if self.pending.is_full() {
            self.commit_one();
        }
        Self::apply(&mut self.shadow, op);
        self.pending
            .push_back(op)
            .expect("a slot was freed above if the queue was full");
    }

    fn apply(image: &mut [u8; N], op: PendingOp) {
        match op {
            PendingOp::Write { addr, value } => image[addr as usize] = value,
            PendingOp::Copy { dst, src, len } => {
                for i in 0..len as usize {
                    image[dst as usize + i] = image[src as usize + i];
                }
            }
        }
    }
}

impl<const N: usize> Default for QueuedEeprom<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Eeprom for QueuedEeprom<N> {
    type Error = Infallible;

    fn read(&mut self, addr: u16) -> Result<u8, Self::Error> {
        Ok(self.shadow[addr as usize])
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), Self::Error> {
        self.enqueue(PendingOp::Write { addr, value });
        Ok(())
    }

    fn copy(&mut self, dst: u16, src: u16, len: u8) -> Result<(), Self::Error> {
        self.enqueue(PendingOp::Copy { dst, src, len });
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        while !self.pending.is_empty() {
            self.commit_one();
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_reads_observe_queued_writes() {
        let mut eeprom = QueuedEeprom::<64>::new();
        eeprom.write(3, 0xAB).unwrap();
        assert_eq!(eeprom.read(3), Ok(0xAB));
        assert_eq!(eeprom.committed()[3], 0xFF);
        eeprom.flush().unwrap();
        assert_eq!(eeprom.committed()[3], 0xAB);
    }

    #[test]
    fn test_power_loss_drops_uncommitted_tail() {
        let mut eeprom = QueuedEeprom::<64>::new();
        eeprom.write(0, 1).unwrap();
        eeprom.write(1, 2).unwrap();
        eeprom.write(2, 3).unwrap();
        eeprom.commit_partial(2);
        eeprom.lose_power();
        assert_eq!(eeprom.read(0), Ok(1));
        assert_eq!(eeprom.read(1), Ok(2));
        assert_eq!(eeprom.read(2), Ok(0xFF));
    }

    #[test]
    fn test_copy_commits_in_order() {
        let mut eeprom = QueuedEeprom::<64>::new();
        eeprom.write(10, 0x11).unwrap();
        eeprom.write(11, 0x22).unwrap();
        // The copy sees the two writes because it commits after them.
        eeprom.copy(0, 10, 2).unwrap();
        eeprom.flush().unwrap();
        assert_eq!(eeprom.committed()[0], 0x11);
        assert_eq!(eeprom.committed()[1], 0x22);
    }

    #[test]
    fn test_overlapping_left_copy() {
        let mut eeprom = QueuedEeprom::<64>::new();
        for i in 0..8u16 {
            eeprom.write(4 + i, i as u8).unwrap();
        }
        eeprom.copy(2, 4, 8).unwrap();
        eeprom.flush().unwrap();
        for i in 0..8usize {
            assert_eq!(eeprom.committed()[2 + i], i as u8);
        }
    }

    #[test]
    fn test_full_queue_drains_oldest_first() {
        let mut eeprom = QueuedEeprom::<256>::new();
        for i in 0..(QUEUE_DEPTH + 10) as u16 {
            eeprom.write(i, 0x55).unwrap();
        }
        assert_eq!(eeprom.pending_ops(), QUEUE_DEPTH);
        // The overflowed prefix has already committed, in order.
        for i in 0..10 {
            assert_eq!(eeprom.committed()[i], 0x55);
        }
    }
}
