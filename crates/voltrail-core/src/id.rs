use slotmap::new_key_type;

new_key_type! {
    /// Identifies a block (rotatable/movable cube carrying connectors).
    pub struct BlockId;

    /// Identifies a rail stop (a node blocks can rest on).
    pub struct RailStopId;

    /// Identifies a rail segment (a piece of track attached to a stop).
    pub struct RailSegmentId;
}
