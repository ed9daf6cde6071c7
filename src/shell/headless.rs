//! In-memory [`Shell`] implementation.
//!
//! Keeps the daemon fully operable without a compositor session: surfaces,
//! the modal grab and keyboard focus are plain process-local state. Every
//! test drives the session through this shell.

use std::collections::HashMap;

use anyhow::bail;

use super::{Point, Rectangle, Shell, SurfaceId, SurfaceSpec, Toplevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Plain,
    Entry,
    Label,
}

#[derive(Debug)]
struct Surface {
    name: Option<String>,
    parent: Option<SurfaceId>,
    #[allow(dead_code)]
    geometry: Rectangle,
    position: Point,
    text: String,
    kind: Kind,
}

pub struct Headless {
    surfaces: HashMap<SurfaceId, Surface>,
    // Creation order, so toplevels() enumerates deterministically.
    order: Vec<SurfaceId>,
    modal: Option<SurfaceId>,
    focus: Option<SurfaceId>,
    combined: Rectangle,
    primary: Rectangle,
    /// Makes `push_modal` refuse, simulating a compositor that denies the grab.
    pub refuse_modal: bool,
}

impl Headless {
    pub fn new() -> Self {
        Self::with_geometry(Rectangle::new(0, 0, 1920, 1080))
    }

    pub fn with_geometry(geometry: Rectangle) -> Self {
        Self {
            surfaces: HashMap::new(),
            order: Vec::new(),
            modal: None,
            focus: None,
            combined: geometry,
            primary: geometry,
            refuse_modal: false,
        }
    }

    pub fn modal_holder(&self) -> Option<SurfaceId> {
        self.modal
    }

    pub fn focused(&self) -> Option<SurfaceId> {
        self.focus
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.surfaces.contains_key(&id)
    }

    pub fn toplevels_named(&self, name: &str) -> usize {
        self.toplevels()
            .iter()
            .filter(|toplevel| toplevel.name == name)
            .count()
    }

    pub fn label_text(&self, id: SurfaceId) -> Option<String> {
        let surface = self.surfaces.get(&id)?;
        (surface.kind == Kind::Label).then(|| surface.text.clone())
    }

    pub fn label_position(&self, id: SurfaceId) -> Option<Point> {
        let surface = self.surfaces.get(&id)?;
        (surface.kind == Kind::Label).then_some(surface.position)
    }

    fn insert(&mut self, surface: Surface) -> SurfaceId {
        let id = SurfaceId::next();
        self.surfaces.insert(id, surface);
        self.order.push(id);
        id
    }

    fn children_of(&self, id: SurfaceId) -> Vec<SurfaceId> {
        self.surfaces
            .iter()
            .filter(|(_, surface)| surface.parent == Some(id))
            .map(|(child, _)| *child)
            .collect()
    }
}

impl Default for Headless {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell for Headless {
    fn create_surface(&mut self, spec: SurfaceSpec) -> anyhow::Result<SurfaceId> {
        Ok(self.insert(Surface {
            name: Some(spec.name),
            parent: None,
            geometry: spec.geometry,
            position: spec.geometry.loc,
            text: String::new(),
            kind: Kind::Plain,
        }))
    }

    fn create_entry(
        &mut self,
        parent: SurfaceId,
        geometry: Rectangle,
    ) -> anyhow::Result<SurfaceId> {
        if !self.surfaces.contains_key(&parent) {
            bail!("no such surface: {parent:?}");
        }

        Ok(self.insert(Surface {
            name: None,
            parent: Some(parent),
            geometry,
            position: geometry.loc,
            text: String::new(),
            kind: Kind::Entry,
        }))
    }

    fn create_label(&mut self, parent: SurfaceId, text: &str) -> anyhow::Result<SurfaceId> {
        if !self.surfaces.contains_key(&parent) {
            bail!("no such surface: {parent:?}");
        }

        Ok(self.insert(Surface {
            name: None,
            parent: Some(parent),
            geometry: Rectangle::default(),
            position: Point::default(),
            text: text.to_owned(),
            kind: Kind::Label,
        }))
    }

    fn destroy_surface(&mut self, id: SurfaceId) -> anyhow::Result<()> {
        if self.surfaces.remove(&id).is_none() {
            bail!("no such surface: {id:?}");
        }

        for child in self.children_of(id) {
            let _ = self.destroy_surface(child);
        }

        self.order.retain(|other| *other != id);
        if self.focus == Some(id) {
            self.focus = None;
        }
        // The modal grab is deliberately left in place when its holder is
        // destroyed: that is exactly the half-torn-down state stray
        // reclamation has to cope with.

        Ok(())
    }

    fn push_modal(&mut self, id: SurfaceId) -> bool {
        if self.refuse_modal || !self.surfaces.contains_key(&id) {
            return false;
        }

        match self.modal {
            None => {
                self.modal = Some(id);
                true
            }
            Some(holder) => holder == id,
        }
    }

    fn pop_modal(&mut self, id: SurfaceId) -> anyhow::Result<()> {
        if self.modal != Some(id) {
            bail!("surface {id:?} does not hold the modal grab");
        }

        self.modal = None;
        Ok(())
    }

    fn toplevels(&self) -> Vec<Toplevel> {
        self.order
            .iter()
            .filter_map(|id| {
                let surface = self.surfaces.get(id)?;
                if surface.parent.is_some() {
                    return None;
                }
                Some(Toplevel {
                    id: *id,
                    name: surface.name.clone().unwrap_or_default(),
                })
            })
            .collect()
    }

    fn combined_geometry(&self) -> Rectangle {
        self.combined
    }

    fn primary_geometry(&self) -> Rectangle {
        self.primary
    }

    fn grab_focus(&mut self, id: SurfaceId) -> anyhow::Result<()> {
        if !self.surfaces.contains_key(&id) {
            bail!("no such surface: {id:?}");
        }

        self.focus = Some(id);
        Ok(())
    }

    fn entry_text(&self, id: SurfaceId) -> String {
        self.surfaces
            .get(&id)
            .map(|surface| surface.text.clone())
            .unwrap_or_default()
    }

    fn set_entry_text(&mut self, id: SurfaceId, text: &str) {
        if let Some(surface) = self.surfaces.get_mut(&id) {
            surface.text = text.to_owned();
        }
    }

    fn set_label(&mut self, id: SurfaceId, text: &str, position: Point) {
        if let Some(surface) = self.surfaces.get_mut(&id) {
            surface.text = text.to_owned();
            surface.position = position;
        }
    }
}
