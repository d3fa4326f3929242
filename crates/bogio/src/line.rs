//! Input line splitting.

use memchr::memchr2;

/// Pop one complete line off the front of `buf`, or `None` if no line
/// terminator has arrived yet.
///
/// Telnet clients mostly send CRLF, but bare `\n`, bare `\r`, and CRNUL all
/// occur in the wild. `\n` and `\r` both end a line; a `\r` followed by `\n`
/// or `\0` consumes both bytes.
pub fn pop_line(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let i = memchr2(b'\n', b'\r', buf.as_slice())?;

    let line = buf.drain(0..i).collect::<Vec<u8>>();

    // Drain the terminator itself, plus the second byte of CRLF / CRNUL.
    let first = buf.remove(0);
    if first == b'\r' && !buf.is_empty() && (buf[0] == b'\n' || buf[0] == 0) {
        buf.remove(0);
    }

    Some(line)
}

/// Decode a raw line for command handling: lossy UTF-8, surrounding
/// whitespace trimmed.
pub fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_lf_line() {
        let mut buf = b"hello\nrest".to_vec();
        assert_eq!(pop_line(&mut buf).unwrap(), b"hello");
        assert_eq!(buf, b"rest");
    }

    #[test]
    fn pops_crlf_line() {
        let mut buf = b"hello\r\nrest".to_vec();
        assert_eq!(pop_line(&mut buf).unwrap(), b"hello");
        assert_eq!(buf, b"rest");
    }

    #[test]
    fn pops_bare_cr_line() {
        let mut buf = b"hello\rrest".to_vec();
        assert_eq!(pop_line(&mut buf).unwrap(), b"hello");
        assert_eq!(buf, b"rest");
    }

    #[test]
    fn pops_crnul_line() {
        let mut buf = b"hello\r\0rest".to_vec();
        assert_eq!(pop_line(&mut buf).unwrap(), b"hello");
        assert_eq!(buf, b"rest");
    }

    #[test]
    fn no_terminator_yet() {
        let mut buf = b"partial".to_vec();
        assert!(pop_line(&mut buf).is_none());
        assert_eq!(buf, b"partial");
    }

    #[test]
    fn pops_queued_lines_in_order() {
        let mut buf = b"one\r\ntwo\nthree\r\n".to_vec();
        assert_eq!(pop_line(&mut buf).unwrap(), b"one");
        assert_eq!(pop_line(&mut buf).unwrap(), b"two");
        assert_eq!(pop_line(&mut buf).unwrap(), b"three");
        assert!(pop_line(&mut buf).is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn empty_line_is_a_line() {
        let mut buf = b"\r\nnext".to_vec();
        assert_eq!(pop_line(&mut buf).unwrap(), b"");
        assert_eq!(buf, b"next");
    }

    #[test]
    fn decode_trims_and_survives_bad_utf8() {
        assert_eq!(decode_line(b"  look barrel  "), "look barrel");
        assert_eq!(decode_line(&[0xff, b'h', b'i', 0xff]), "\u{fffd}hi\u{fffd}");
    }
}
