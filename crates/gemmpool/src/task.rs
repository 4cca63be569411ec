/// One tile-multiply work item: overwrite a `TILE_SIZE x TILE_SIZE` block of
/// C with the product of one A row-panel and one B column-panel.
///
/// The pointers are non-owning views into caller buffers. B uses the
/// transposed layout: its logical row `j` (length `n_k`, pitch `stride_b`)
/// holds output column `j`, so the kernel's inner loop is stride-1 on both
/// operands.
///
/// Tasks are plain values: the dispatcher copies them into queue slots and
/// workers copy them back out. [`mm`](crate::mm) blocks on the completion
/// barrier before returning, so a task never outlives the buffers it points
/// into.
#[derive(Debug, Clone, Copy)]
pub struct TileTask {
    /// First element of the A tile: `TILE_SIZE` rows of pitch `stride_a`.
    pub a: *const f32,
    /// First element of the transposed B tile: `TILE_SIZE` rows of pitch
    /// `stride_b`.
    pub b: *const f32,
    /// First element of the output tile, pitch `stride_c`.
    pub c: *mut f32,
    /// Row pitch of A in elements.
    pub stride_a: usize,
    /// Row pitch of transposed B in elements.
    pub stride_b: usize,
    /// Row pitch of C in elements.
    pub stride_c: usize,
    /// Reduction length (the padded shared dimension).
    pub n_k: usize,
}

impl TileTask {
    /// Builds a task from raw tile origins.
    ///
    /// # Safety
    ///
    /// The caller must keep all three buffers alive and the C tile
    /// exclusively writable until the task has been executed. The driver
    /// upholds this by waiting on the completion barrier before its borrows
    /// end, and by carving C into disjoint tiles.
    pub unsafe fn new(
        a: *const f32,
        b: *const f32,
        c: *mut f32,
        stride_a: usize,
        stride_b: usize,
        stride_c: usize,
        n_k: usize,
    ) -> Self {
        Self {
            a,
            b,
            c,
            stride_a,
            stride_b,
            stride_c,
            n_k,
        }
    }
}

// Safety: a task is an inert description until a worker runs the kernel on
// it. A and B are read-only for the duration of a driver call and each C
// tile is claimed by exactly one worker, so moving the description across
// threads is sound.
unsafe impl Send for TileTask {}
