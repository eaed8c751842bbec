/// One raw amplifier reading with its arrival time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub value: i32,
    /// Milliseconds since the dump started.
    pub at_ms: u64,
}
