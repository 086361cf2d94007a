pub mod effects;
/// Per-frame render context and the renderer trait.
pub mod frame;
/// Off-screen surfaces and their provider.
pub mod surface;
