//! [`IoChannel`] over an in-memory transport: write-side encoding/flush
//! behavior, and read-side line splitting across mixed terminators plus a
//! partial multi-byte character left dangling at EOF.

use evloop::channel::transport::MemoryTransport;
use evloop::error::Status;
use evloop::IoChannel;

#[test]
fn written_bytes_land_on_the_transport_after_flush() {
    let transport = std::sync::Arc::new(MemoryTransport::new(Vec::new()));
    let ch = IoChannel::new(Box::new(TransportRef(std::sync::Arc::clone(&transport))), false, true);

    let (status, n) = ch.write_chars(b"first\nsecond\r\nthird");
    assert_eq!(status, Status::Normal);
    assert_eq!(n, b"first\nsecond\r\nthird".len());
    assert_eq!(ch.flush(), Status::Normal);
    assert_eq!(transport.written(), b"first\nsecond\r\nthird");
}

#[test]
fn lines_are_split_on_their_own_terminators() {
    let ch = IoChannel::new(
        Box::new(MemoryTransport::new(b"first\nsecond\r\nthird".to_vec())),
        true,
        false,
    );

    let (status, line) = ch.read_line();
    assert_eq!(status, Status::Normal);
    assert_eq!(line, b"first\n");

    let (status, line) = ch.read_line();
    assert_eq!(status, Status::Normal);
    assert_eq!(line, b"second\r\n");

    // "third" has no trailing terminator at all; the caller has to ask for
    // everything that's left instead of another line.
    let (status, rest) = ch.read_to_end();
    assert_eq!(status, Status::Normal);
    assert_eq!(rest, b"third");
}

#[test]
fn partial_multibyte_character_at_eof_is_reported_as_an_error() {
    // The first two bytes of the three-byte UTF-8 encoding of '€'
    // (0xE2 0x82 0xAC), with the third byte missing: a transport that ends
    // here has handed the channel a truncated character, not valid input.
    let ch = IoChannel::new(Box::new(MemoryTransport::new(vec![b'o', b'k', 0xE2, 0x82])), true, false);

    let (status, _) = ch.read_to_end();
    assert_eq!(status, Status::Error);
}

/// Forwards to a shared [`MemoryTransport`] so the write-side test can
/// inspect it after handing ownership of a `Box<dyn Transport>` to the
/// channel.
struct TransportRef(std::sync::Arc<MemoryTransport>);

impl evloop::channel::transport::Transport for TransportRef {
    fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
    fn write(&self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }
    fn seek(&self, pos: evloop::channel::transport::SeekFrom) -> std::io::Result<Option<u64>> {
        self.0.seek(pos)
    }
    fn close(&self) -> std::io::Result<()> {
        self.0.close()
    }
    fn poll_fd(&self, condition: evloop::IoCondition) -> Option<evloop::PollFd> {
        self.0.poll_fd(condition)
    }
}
