//! Lock-free SPSC ring of inbound audio chunks.
//!
//! The transport thread owns the producer and pushes whole `PcmBuffer`s
//! with `try_push`, which never blocks or allocates. The stream task owns the
//! consumer.

use ringbuf::{traits::Split, HeapRb};

pub use ringbuf::traits::{Consumer, Observer, Producer};

use crate::audio::PcmBuffer;

/// Producer half, held by the transport side.
pub type InboundProducer = ringbuf::HeapProd<PcmBuffer>;

/// Consumer half, held by the stream task.
pub type InboundConsumer = ringbuf::HeapCons<PcmBuffer>;

/// Default ring size in chunks: at 20 ms per transport frame, ~5 s of slack.
pub const DEFAULT_INBOUND_CAPACITY: usize = 256;

/// Create a matched producer/consumer pair holding up to `capacity` chunks.
pub fn create_inbound_ring(capacity: usize) -> (InboundProducer, InboundConsumer) {
    HeapRb::<PcmBuffer>::new(capacity.max(1)).split()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(v: i16) -> PcmBuffer {
        PcmBuffer::from_i16(vec![v; 4], 16_000, 1).unwrap()
    }

    #[test]
    fn full_ring_hands_the_chunk_back() {
        let (mut prod, mut cons) = create_inbound_ring(2);
        assert!(prod.try_push(chunk(1)).is_ok());
        assert!(prod.try_push(chunk(2)).is_ok());
        let rejected = prod.try_push(chunk(3)).unwrap_err();
        assert_eq!(rejected.as_i16().unwrap()[0], 3);

        assert_eq!(cons.try_pop().unwrap().as_i16().unwrap()[0], 1);
        assert_eq!(cons.occupied_len(), 1);
    }
}
