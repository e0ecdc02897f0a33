quantity!(Cost, "¤");

impl Cost {
    /// Largest representable cost, used as a sentinel bound before any schedule is known.
    pub const MAX: Self = Self(i64::MAX);
}
