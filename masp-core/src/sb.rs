//! The growable byte buffer (`sb` in the original `gasp`/MASP sources).
//!
//! Ported from `sb.c`'s `sb_build`/`sb_check` growth discipline: storage is
//! always fully allocated to `1 << pot` bytes, `len` tracks the valid
//! prefix, and growth doubles the power-of-two exponent until the request
//! fits. Exceeding the maximum exponent aborts the process, matching the
//! original's `abort()` calls on overflow.

/// Initial capacity exponent (`dsize` in `sb.c`): `1 << 5` == 32 bytes.
const DEFAULT_POWER_TWO: u32 = 5;

/// Implementation-defined maximum capacity exponent. `sb.c` abort()s once
/// `pot >= sb_max_power_two`; we pick a generous bound (1 GiB) since the
/// original's own `sb_max_power_two` is an external constant not carried
/// over by the distillation.
pub const MAX_POWER_TWO: u32 = 30;

/// A growable byte buffer with the semantic operations `spec.md` §4.A
/// requires on top of plain appending: whitespace/comma skipping and
/// quoted-literal scanning.
#[derive(Debug, Clone)]
pub struct ByteBuffer {
    storage: Vec<u8>,
    len: usize,
    pot: u32,
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteBuffer {
    /// Creates an empty buffer with the default initial capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_power_of_two(DEFAULT_POWER_TWO)
    }

    /// Creates an empty buffer whose capacity is exactly `1 << pot` bytes.
    ///
    /// # Panics
    /// Panics (the Rust analogue of the original's `abort()`) if `pot`
    /// exceeds [`MAX_POWER_TWO`].
    #[must_use]
    pub fn with_power_of_two(pot: u32) -> Self {
        assert!(
            pot <= MAX_POWER_TWO,
            "sb: requested capacity exponent {pot} exceeds maximum {MAX_POWER_TWO}"
        );
        Self { storage: vec![0u8; 1usize << pot], len: 0, pot }
    }

    /// Builds a buffer already holding the bytes of `s`.
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        let mut sb = Self::new();
        sb.append_str(s);
        sb
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    #[must_use]
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// Ensures there is room for `additional` more bytes, growing by
    /// doubling the capacity exponent. Aborts past [`MAX_POWER_TWO`].
    fn check(&mut self, additional: usize) {
        let mut pot = self.pot;
        while self.len + additional > (1usize << pot) {
            pot += 1;
            assert!(
                pot <= MAX_POWER_TWO,
                "sb: buffer would exceed maximum capacity (2^{MAX_POWER_TWO} bytes)"
            );
        }
        if pot != self.pot {
            self.storage.resize(1usize << pot, 0);
            self.pot = pot;
        }
    }

    /// Appends one byte.
    pub fn append_char(&mut self, c: u8) {
        self.check(1);
        self.storage[self.len] = c;
        self.len += 1;
    }

    /// Appends the given byte range.
    pub fn append_bytes(&mut self, src: &[u8]) {
        self.check(src.len());
        self.storage[self.len..self.len + src.len()].copy_from_slice(src);
        self.len += src.len();
    }

    /// Appends the contents of another buffer.
    pub fn append_buffer(&mut self, other: &ByteBuffer) {
        self.append_bytes(other.as_bytes());
    }

    /// Appends a Rust string (whole thing; Rust strings carry no embedded
    /// NUL in ordinary use).
    pub fn append_str(&mut self, s: &str) {
        self.append_bytes(s.as_bytes());
    }

    /// Appends a null-terminated byte sequence up to (not including) the
    /// first NUL, matching `sb_add_string`'s `strlen`-bounded copy.
    pub fn append_c_str(&mut self, s: &[u8]) {
        let n = s.iter().position(|&b| b == 0).unwrap_or(s.len());
        self.append_bytes(&s[..n]);
    }

    /// Resets `len` to zero; capacity is retained.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Releases the buffer. Provided for parity with the original API;
    /// `Drop` already does this, so `kill` is just an explicit early move.
    pub fn kill(self) {}

    /// Appends a NUL and returns a view up to and including it. Unlike
    /// [`Self::terminate`], `len` is advanced past the NUL.
    pub fn as_c_string(&mut self) -> &[u8] {
        self.check(1);
        self.storage[self.len] = 0;
        self.len += 1;
        &self.storage[..self.len]
    }

    /// Appends a NUL without counting it in `len`, and returns a view up
    /// to and including it (`p[len] == 0`, `len` unchanged).
    pub fn terminate(&mut self) -> &[u8] {
        self.check(1);
        self.storage[self.len] = 0;
        &self.storage[..=self.len]
    }

    /// Smallest `j >= idx` such that `bytes[j]` is not space/tab (or
    /// `j == len`).
    #[must_use]
    pub fn skip_whitespace(&self, idx: usize) -> usize {
        let mut j = idx;
        while j < self.len && matches!(self.storage[j], b' ' | b'\t') {
            j += 1;
        }
        j
    }

    /// Skips whitespace, an optional comma, then whitespace again.
    #[must_use]
    pub fn skip_comma(&self, idx: usize) -> usize {
        let mut j = self.skip_whitespace(idx);
        if j < self.len && self.storage[j] == b',' {
            j += 1;
        }
        self.skip_whitespace(j)
    }

    /// If `bytes[idx]` opens a string/char literal (`"` or `'`), copies it
    /// (delimiters included, backslash-escapes collapsed by dropping the
    /// backslash and copying the following byte verbatim) into `out` and
    /// returns the index just past the closing quote. Otherwise returns
    /// `idx` unchanged and leaves `out` untouched.
    pub fn eat_literal(&self, idx: usize, out: &mut ByteBuffer) -> usize {
        if idx >= self.len || !matches!(self.storage[idx], b'"' | b'\'') {
            return idx;
        }
        let quote = self.storage[idx];
        let mut i = idx;
        out.append_char(self.storage[i]);
        i += 1;
        while i < self.len {
            if self.storage[i] == b'\\' && i < self.len - 1 {
                i += 1;
                out.append_char(self.storage[i]);
                i += 1;
            } else if self.storage[i] == quote {
                out.append_char(self.storage[i]);
                i += 1;
                return i;
            } else {
                out.append_char(self.storage[i]);
                i += 1;
            }
        }
        i
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_reset_round_trip() {
        let mut sb = ByteBuffer::new();
        sb.append_str("hello, ");
        sb.append_char(b'w');
        sb.append_bytes(b"orld");
        assert_eq!(sb.as_bytes(), b"hello, world");
        sb.reset();
        assert!(sb.is_empty());
        sb.append_str("again");
        assert_eq!(sb.as_bytes(), b"again");
    }

    #[test]
    fn append_buffer_concatenates() {
        let mut a = ByteBuffer::from_str("foo");
        let b = ByteBuffer::from_str("bar");
        a.append_buffer(&b);
        assert_eq!(a.as_bytes(), b"foobar");
    }

    #[test]
    fn append_c_str_stops_at_nul() {
        let mut sb = ByteBuffer::new();
        sb.append_c_str(b"abc\0def");
        assert_eq!(sb.as_bytes(), b"abc");
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut sb = ByteBuffer::with_power_of_two(2); // capacity 4
        let long = "x".repeat(100);
        sb.append_str(&long);
        assert_eq!(sb.len(), 100);
        assert!(sb.capacity() >= 100);
        assert_eq!(sb.as_bytes(), long.as_bytes());
    }

    #[test]
    #[should_panic(expected = "exceeds maximum")]
    fn with_power_of_two_past_max_aborts() {
        let _ = ByteBuffer::with_power_of_two(MAX_POWER_TWO + 1);
    }

    #[test]
    fn as_c_string_advances_len_past_nul() {
        let mut sb = ByteBuffer::from_str("hi");
        let view = sb.as_c_string();
        assert_eq!(view, b"hi\0");
        assert_eq!(sb.len(), 3);
    }

    #[test]
    fn terminate_does_not_advance_len() {
        let mut sb = ByteBuffer::from_str("hi");
        let view = sb.terminate();
        assert_eq!(view, b"hi\0");
        assert_eq!(sb.len(), 2);
    }

    #[test]
    fn skip_whitespace_is_idempotent() {
        let sb = ByteBuffer::from_str("   \tx");
        let once = sb.skip_whitespace(0);
        let twice = sb.skip_whitespace(once);
        assert_eq!(once, twice);
        assert_eq!(once, 4);
    }

    #[test]
    fn skip_comma_skips_whitespace_then_one_comma_then_whitespace() {
        let sb = ByteBuffer::from_str("  , next");
        assert_eq!(sb.skip_comma(0), 4);
        let sb2 = ByteBuffer::from_str("next");
        // no comma present: behaves like skip_whitespace
        assert_eq!(sb2.skip_comma(0), 0);
    }

    #[test]
    fn eat_literal_identity_on_unquoted_position() {
        let sb = ByteBuffer::from_str("bareword");
        let mut out = ByteBuffer::new();
        let idx = sb.eat_literal(0, &mut out);
        assert_eq!(idx, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn eat_literal_round_trips_an_escape_free_literal() {
        let q = "\"hello world\"";
        let sb = ByteBuffer::from_str(&format!("{q} trailing"));
        let mut out = ByteBuffer::new();
        let idx = sb.eat_literal(0, &mut out);
        assert_eq!(out.as_bytes(), q.as_bytes());
        assert_eq!(idx, q.len());
    }

    #[test]
    fn eat_literal_drops_backslash_before_escaped_byte() {
        // Mirrors sb_eat_literal: the backslash itself is never copied.
        let sb = ByteBuffer::from_str(r#""a\"b""#);
        let mut out = ByteBuffer::new();
        let idx = sb.eat_literal(0, &mut out);
        assert_eq!(out.as_bytes(), b"\"a\"b\"");
        assert_eq!(idx, 6);
    }
}
