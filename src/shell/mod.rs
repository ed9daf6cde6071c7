//! Boundary to the host compositor.
//!
//! The compositor owns the real surfaces, the topmost compositing layer and
//! the modal-grab primitive; everything the daemon needs from it goes through
//! the [`Shell`] trait. [`headless::Headless`] implements the trait entirely
//! in memory for running without a compositor session and for tests.

use std::sync::atomic::{AtomicU32, Ordering};

pub mod headless;

/// Logical, compositor-global pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub w: i32,
    pub h: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub loc: Point,
    pub size: Size,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            loc: Point { x, y },
            size: Size { w, h },
        }
    }
}

static NEXT_SURFACE_ID: AtomicU32 = AtomicU32::new(1);

/// Identifier of a surface created through a [`Shell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u32);

impl SurfaceId {
    pub fn next() -> Self {
        Self(NEXT_SURFACE_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Parameters for a new top-level surface.
///
/// Top-level surfaces land in the topmost compositing layer, above ordinary
/// windows, and are opaque.
#[derive(Debug, Clone)]
pub struct SurfaceSpec {
    pub name: String,
    pub geometry: Rectangle,
}

/// A surface currently registered in the topmost compositing layer.
#[derive(Debug, Clone)]
pub struct Toplevel {
    pub id: SurfaceId,
    pub name: String,
}

pub trait Shell {
    fn create_surface(&mut self, spec: SurfaceSpec) -> anyhow::Result<SurfaceId>;

    /// Creates a text-entry sub-surface attached to `parent`.
    fn create_entry(&mut self, parent: SurfaceId, geometry: Rectangle)
        -> anyhow::Result<SurfaceId>;

    /// Creates a label sub-surface attached to `parent`.
    fn create_label(&mut self, parent: SurfaceId, text: &str) -> anyhow::Result<SurfaceId>;

    /// Destroys a surface together with its sub-surfaces.
    fn destroy_surface(&mut self, id: SurfaceId) -> anyhow::Result<()>;

    /// Routes all input exclusively to `id` until released. `false` when the
    /// compositor refuses the grab.
    fn push_modal(&mut self, id: SurfaceId) -> bool;

    /// Releases the modal grab held by `id`. Errors when `id` does not hold
    /// it; teardown paths observe and discard that error.
    fn pop_modal(&mut self, id: SurfaceId) -> anyhow::Result<()>;

    /// Surfaces currently registered in the topmost layer.
    fn toplevels(&self) -> Vec<Toplevel>;

    /// Bounding box of all outputs. The overlay spans this.
    fn combined_geometry(&self) -> Rectangle;

    /// Geometry of the primary output. The prompt and the status label center
    /// on this.
    fn primary_geometry(&self) -> Rectangle;

    fn grab_focus(&mut self, id: SurfaceId) -> anyhow::Result<()>;

    /// Current text of an entry surface; empty when the surface is gone.
    fn entry_text(&self, id: SurfaceId) -> String;

    fn set_entry_text(&mut self, id: SurfaceId, text: &str);

    fn set_label(&mut self, id: SurfaceId, text: &str, position: Point);
}
