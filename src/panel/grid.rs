//! Virtualized grid.
//!
//! The render binding holds lightweight index proxies into the backing
//! item array instead of full item copies, so a structural change
//! republished to the UI runtime never re-serializes item payloads.

use serde::Serialize;

use crate::ui::{CellMargins, Node};

/// Stable handle into the backing item array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridIndexProxy {
    pub index: usize,
}

/// Container dimensions supplied by the host at render time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridViewport {
    pub width: f32,
    pub height: f32,
}

/// Fixed per-cell geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellGeometry {
    pub width: f32,
    pub height: f32,
    pub gap: f32,
}

#[derive(Debug)]
pub struct GridVirtualizer<T> {
    items: Vec<T>,
    proxies: Vec<GridIndexProxy>,
    cell: CellGeometry,
}

impl<T> GridVirtualizer<T> {
    pub fn new(cell: CellGeometry) -> Self {
        Self {
            items: Vec::new(),
            proxies: Vec::new(),
            cell,
        }
    }

    /// Replace the backing array and republish one proxy per item, in
    /// order.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.proxies = (0..items.len()).map(|index| GridIndexProxy { index }).collect();
        self.items = items;
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.proxies.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// The render binding payload. `None` when there is nothing to render:
    /// the underlying renderer rejects empty child collections.
    pub fn proxies(&self) -> Option<&[GridIndexProxy]> {
        if self.proxies.is_empty() {
            None
        } else {
            Some(&self.proxies)
        }
    }

    /// Column count for the given viewport. Recomputed per call; the item
    /// count can change between renders.
    pub fn columns(&self, viewport: GridViewport) -> usize {
        let span = self.cell.width + self.cell.gap;
        if span <= 0.0 {
            return 1;
        }
        (((viewport.width + self.cell.gap) / span).floor() as usize).max(1)
    }

    /// Trailing margins for the cell at `index`. The last column gets no
    /// right margin and the last row no bottom margin.
    pub fn margins(&self, index: usize, viewport: GridViewport) -> CellMargins {
        let columns = self.columns(viewport);
        let rows = ((self.items.len() + columns - 1) / columns).max(1);
        let col = index % columns;
        let row = index / columns;
        CellMargins {
            right: if col + 1 == columns { 0.0 } else { self.cell.gap },
            bottom: if row + 1 == rows { 0.0 } else { self.cell.gap },
        }
    }

    /// Render one proxy: look up the backing item, invoke the item
    /// renderer with `(item, index, total)`, then stamp freshly computed
    /// cell geometry on the produced node.
    pub fn render_with<F>(
        &self,
        proxy: GridIndexProxy,
        override_index: Option<usize>,
        viewport: GridViewport,
        render: F,
    ) -> Option<Node>
    where
        F: FnOnce(&T, usize, usize) -> Node,
    {
        let item = self.items.get(proxy.index)?;
        let index = override_index.unwrap_or(proxy.index);
        let mut node = render(item, index, self.items.len());
        node.width = self.cell.width;
        node.height = self.cell.height;
        node.margins = self.margins(index, viewport);
        Some(node)
    }
}
