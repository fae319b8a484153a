/// A half-open range of arena offsets, `base..acme`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Span {
    pub base: usize,
    pub acme: usize,
}

impl PartialEq for Span {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        (self.is_empty() && other.is_empty())
        || (self.base == other.base && self.acme == other.acme)
    }
}
impl Eq for Span {}

impl Span {
    pub const fn empty() -> Self {
        Self { base: 0, acme: 0 }
    }

    pub const fn new(base: usize, acme: usize) -> Self {
        Self { base, acme }
    }

    pub const fn size(&self) -> usize {
        if self.acme > self.base {
            self.acme - self.base
        } else {
            0
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.base >= self.acme
    }

    /// Returns whether `self` contains the offset `other`.
    pub const fn contains(&self, other: usize) -> bool {
        self.base <= other && other < self.acme
    }
}

impl core::fmt::Display for Span {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{:#x}..{:#x}", self.base, self.acme))
    }
}
