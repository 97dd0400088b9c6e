/// Default capacity of a payload buffer, sized to fit a single UDP datagram
/// without fragmentation on common links.
pub const MTU_SIZE_BYTES: usize = 1430;
