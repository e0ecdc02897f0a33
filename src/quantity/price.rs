quantity!(
    /// Fixed-point price of one energy unit, for example, in tenths of a cent.
    Price,
    "¤/Wh"
);
