use crate::mesh::MeshCursor;
use crate::prelude::*;

/// Iterator over the points of a mesh, built on [`MeshCursor`].
///
/// Each item carries the cursor of the point so it can be handed back to
/// [`Mesh::set_node_value`] once the iteration borrow has ended.
pub struct Points<'a, M: ?Sized> {
    mesh: &'a M,
    cursor: Option<MeshCursor>,
    started: bool,
}

impl<'a, M: Mesh + ?Sized> Points<'a, M> {
    pub(crate) fn new(mesh: &'a M) -> Self {
        Self {
            mesh,
            cursor: None,
            started: false,
        }
    }
}

impl<'a, M: Mesh + ?Sized> Iterator for Points<'a, M> {
    type Item = (MeshCursor, LocatedVector);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            let (cursor, point) = self.mesh.first_point()?;
            self.cursor = Some(cursor);
            return Some((cursor, point));
        }

        let cursor = self.cursor.as_mut()?;
        let point = self.mesh.next_point(cursor)?;
        Some((*cursor, point))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let seen = match (self.started, &self.cursor) {
            (false, _) => 0,
            (true, Some(cursor)) => cursor.node() + 1,
            (true, None) => self.mesh.len(),
        };
        let left = self.mesh.len().saturating_sub(seen);
        (left, Some(left))
    }
}
