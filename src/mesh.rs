//! A simple explicit mesh of hypercube cells with a degree of freedom numbering.
//!
//! The mesh is mainly meant for driving evaluation contexts in tests and demos. Cells are handed
//! out as [`MeshCell`] snapshots that own their data, so the mesh can be modified while contexts
//! still hold a cell; every modification is announced through the [`MeshSignals`] of the mesh.
use crate::cell::Cell;
use crate::element::ElementData;
use crate::reference_cell::ReferenceCell;
use crate::signals::{MeshChange, MeshSignals};
use eyre::{eyre, WrapErr};
use fevalues_traits::Real;
use nalgebra::{Point, SVector, Scalar};
use rustc_hash::FxHashMap;
use std::sync::Arc;

pub mod procedural;

/// How degrees of freedom are distributed over the cells of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DofNumbering {
    /// One degree of freedom per vertex and component, shared by all cells at the vertex.
    ///
    /// Local degree of freedom `j * n_components + k` of a cell is component `k` at local vertex
    /// `j`, which matches first order Lagrange elements and systems built from them.
    Vertex,
    /// Every cell has its own degrees of freedom, numbered consecutively cell by cell.
    Discontinuous,
}

#[derive(Debug, Clone)]
struct CellRecord {
    reference_cell: ReferenceCell,
    vertex_indices: Vec<usize>,
    face_indices: Vec<usize>,
    has_children: bool,
    direction_flag: bool,
}

#[derive(Debug, Clone, Default)]
struct FaceRecord {
    max_children: usize,
    children: Vec<usize>,
    periodic_neighbor: Option<usize>,
}

#[derive(Debug, Clone)]
struct DofLayout {
    element_data: ElementData,
    n_global_dofs: usize,
    cell_dofs: Vec<Vec<usize>>,
}

#[derive(Debug)]
pub struct Mesh<T: Scalar, const SPACEDIM: usize> {
    vertices: Vec<Point<T, SPACEDIM>>,
    cells: Vec<CellRecord>,
    faces: Vec<FaceRecord>,
    dofs: Option<DofLayout>,
    signals: Arc<MeshSignals>,
}

/// The local vertices of face `face_no` of a hypercube, whose vertices are numbered
/// lexicographically.
fn hypercube_face_vertices(reference_cell: ReferenceCell, face_no: usize) -> impl Iterator<Item = usize> {
    let (axis, side) = (face_no / 2, face_no % 2);
    (0..reference_cell.n_vertices()).filter(move |v| (v >> axis) & 1 == side)
}

impl<T: Real, const SPACEDIM: usize> Mesh<T, SPACEDIM> {
    /// Construct a mesh from vertices and cells given as a reference cell and its vertex indices.
    ///
    /// Only hypercube cells are supported. Faces are identified by their sets of vertices.
    pub fn from_vertices_and_cells(
        vertices: Vec<Point<T, SPACEDIM>>,
        cells: Vec<(ReferenceCell, Vec<usize>)>,
    ) -> eyre::Result<Self> {
        let mut face_lookup: FxHashMap<Vec<usize>, usize> = FxHashMap::default();
        let mut faces = Vec::new();
        let mut records = Vec::with_capacity(cells.len());

        for (cell_index, (reference_cell, vertex_indices)) in cells.into_iter().enumerate() {
            if !reference_cell.is_hypercube() || reference_cell.dim() > SPACEDIM {
                return Err(eyre!(
                    "Cell {} has unsupported type {:?} for a mesh in {} dimensions",
                    cell_index,
                    reference_cell,
                    SPACEDIM
                ));
            }
            if vertex_indices.len() != reference_cell.n_vertices() {
                return Err(eyre!(
                    "Cell {} has {} vertices, expected {}",
                    cell_index,
                    vertex_indices.len(),
                    reference_cell.n_vertices()
                ));
            }
            if let Some(&index) = vertex_indices.iter().find(|&&i| i >= vertices.len()) {
                return Err(eyre!("Cell {} references vertex {} out of bounds", cell_index, index));
            }

            let face_indices = (0..reference_cell.n_faces())
                .map(|face_no| {
                    let mut key: Vec<usize> = hypercube_face_vertices(reference_cell, face_no)
                        .map(|v| vertex_indices[v])
                        .collect();
                    key.sort_unstable();
                    *face_lookup.entry(key).or_insert_with(|| {
                        faces.push(FaceRecord {
                            max_children: reference_cell.max_children_per_face(),
                            ..FaceRecord::default()
                        });
                        faces.len() - 1
                    })
                })
                .collect();

            records.push(CellRecord {
                reference_cell,
                vertex_indices,
                face_indices,
                has_children: false,
                direction_flag: true,
            });
        }

        Ok(Self {
            vertices,
            cells: records,
            faces,
            dofs: None,
            signals: Arc::new(MeshSignals::new()),
        })
    }

    pub fn vertices(&self) -> &[Point<T, SPACEDIM>] {
        &self.vertices
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// The number of faces, including the children of refined faces.
    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn signals(&self) -> &MeshSignals {
        &self.signals
    }

    pub fn n_global_dofs(&self) -> Option<usize> {
        self.dofs.as_ref().map(|dofs| dofs.n_global_dofs)
    }

    /// Global index of face `face_no` of cell `cell_index`.
    pub fn face_index(&self, cell_index: usize, face_no: usize) -> Option<usize> {
        self.cells
            .get(cell_index)
            .and_then(|cell| cell.face_indices.get(face_no))
            .copied()
    }

    pub fn get_cell(&self, index: usize) -> Option<MeshCell<T, SPACEDIM>> {
        let record = self.cells.get(index)?;
        let faces = record
            .face_indices
            .iter()
            .map(|&face_index| {
                let face = &self.faces[face_index];
                let n_subfaces = match face.periodic_neighbor {
                    Some(neighbor) if face.children.is_empty() => self.faces[neighbor].children.len(),
                    _ => face.children.len(),
                };
                FaceInfo {
                    index: face_index,
                    children: face.children.clone(),
                    n_subfaces,
                }
            })
            .collect();

        Some(MeshCell {
            index,
            reference_cell: record.reference_cell,
            vertices: record
                .vertex_indices
                .iter()
                .map(|&v| self.vertices[v])
                .collect(),
            faces,
            has_children: record.has_children,
            direction_flag: record.direction_flag,
            dofs: self.dofs.as_ref().map(|layout| CellDofs {
                element_data: layout.element_data,
                n_global_dofs: layout.n_global_dofs,
                indices: layout.cell_dofs[index].clone(),
            }),
            signals: Arc::clone(&self.signals),
        })
    }

    pub fn cell_iter(&self) -> impl '_ + Iterator<Item = MeshCell<T, SPACEDIM>> {
        (0..self.n_cells()).map(move |index| {
            self.get_cell(index)
                .expect("Cell indices below n_cells are always valid")
        })
    }

    /// Numbers the degrees of freedom of an element on every cell. Returns the total number of
    /// degrees of freedom.
    pub fn distribute_dofs(&mut self, element_data: ElementData, numbering: DofNumbering) -> eyre::Result<usize> {
        let mut cell_dofs = Vec::with_capacity(self.cells.len());
        let n_global_dofs = match numbering {
            DofNumbering::Vertex => {
                let n_components = element_data.n_components;
                for (cell_index, cell) in self.cells.iter().enumerate() {
                    let expected = cell.vertex_indices.len() * n_components;
                    if element_data.dofs_per_cell != expected {
                        return Err(eyre!(
                            "Vertex numbering of cell {} needs {} degrees of freedom per cell, \
                             but the element has {}",
                            cell_index,
                            expected,
                            element_data.dofs_per_cell
                        ));
                    }
                    cell_dofs.push(
                        cell.vertex_indices
                            .iter()
                            .flat_map(|&v| (0..n_components).map(move |k| v * n_components + k))
                            .collect(),
                    );
                }
                self.vertices.len() * n_components
            }
            DofNumbering::Discontinuous => {
                let dofs_per_cell = element_data.dofs_per_cell;
                for cell_index in 0..self.cells.len() {
                    let offset = cell_index * dofs_per_cell;
                    cell_dofs.push((offset..offset + dofs_per_cell).collect());
                }
                self.cells.len() * dofs_per_cell
            }
        };

        self.dofs = Some(DofLayout {
            element_data,
            n_global_dofs,
            cell_dofs,
        });
        Ok(n_global_dofs)
    }

    /// Moves all vertices by `offset`.
    pub fn translate(&mut self, offset: &SVector<T, SPACEDIM>) {
        for vertex in &mut self.vertices {
            *vertex += *offset;
        }
        self.signals.notify(MeshChange::Transformation);
    }

    /// Marks a cell as refined. Refined cells are no longer active, so subface values can not be
    /// computed on them.
    pub fn refine_cell(&mut self, cell_index: usize) -> eyre::Result<()> {
        let cell = self
            .cells
            .get_mut(cell_index)
            .ok_or_else(|| eyre!("Cell {} does not exist", cell_index))?;
        cell.has_children = true;
        self.signals.notify(MeshChange::Refinement);
        Ok(())
    }

    /// Splits a face into its children, which receive new face indices.
    pub fn refine_face(&mut self, face_index: usize) -> eyre::Result<()> {
        let n_faces = self.faces.len();
        let face = self
            .faces
            .get_mut(face_index)
            .ok_or_else(|| eyre!("Face {} does not exist", face_index))?;
        if !face.children.is_empty() {
            return Err(eyre!("Face {} is already refined", face_index));
        }
        let max_children = face.max_children;
        face.children = (n_faces..n_faces + max_children).collect();
        self.faces
            .extend((0..max_children).map(|_| FaceRecord::default()));
        self.signals.notify(MeshChange::Refinement);
        Ok(())
    }

    /// Identifies two faces on opposite sides of a periodic boundary.
    ///
    /// A face without children whose periodic neighbor is refined reports the children of the
    /// neighbor as its subfaces.
    pub fn make_periodic(&mut self, face_a: usize, face_b: usize) -> eyre::Result<()> {
        for face in [face_a, face_b] {
            if face >= self.faces.len() {
                return Err(eyre!("Face {} does not exist", face));
            }
        }
        self.faces[face_a].periodic_neighbor = Some(face_b);
        self.faces[face_b].periodic_neighbor = Some(face_a);
        Ok(())
    }

    /// Sets the orientation of a cell embedded in a higher dimensional space.
    pub fn set_direction_flag(&mut self, cell_index: usize, direction_flag: bool) -> eyre::Result<()> {
        self.cells
            .get_mut(cell_index)
            .map(|cell| cell.direction_flag = direction_flag)
            .ok_or_else(|| eyre!("Cell {} does not exist", cell_index))
            .wrap_err("Failed to set direction flag")
    }

    /// Removes all cells, vertices and degrees of freedom.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.cells.clear();
        self.faces.clear();
        self.dofs = None;
        self.signals.notify(MeshChange::Clear);
    }
}

#[derive(Debug, Clone)]
struct FaceInfo {
    index: usize,
    children: Vec<usize>,
    n_subfaces: usize,
}

#[derive(Debug, Clone)]
struct CellDofs {
    element_data: ElementData,
    n_global_dofs: usize,
    indices: Vec<usize>,
}

/// A snapshot of one cell of a [`Mesh`].
#[derive(Debug, Clone)]
pub struct MeshCell<T: Scalar, const SPACEDIM: usize> {
    index: usize,
    reference_cell: ReferenceCell,
    vertices: Vec<Point<T, SPACEDIM>>,
    faces: Vec<FaceInfo>,
    has_children: bool,
    direction_flag: bool,
    dofs: Option<CellDofs>,
    signals: Arc<MeshSignals>,
}

impl<T: Scalar, const SPACEDIM: usize> MeshCell<T, SPACEDIM> {
    /// The index of the cell in its mesh.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn vertices(&self) -> &[Point<T, SPACEDIM>] {
        &self.vertices
    }

    pub fn dof_indices(&self) -> Option<&[usize]> {
        self.dofs.as_ref().map(|dofs| dofs.indices.as_slice())
    }
}

impl<T: Real, const SPACEDIM: usize> Cell<T, SPACEDIM> for MeshCell<T, SPACEDIM> {
    fn signals(&self) -> &MeshSignals {
        &self.signals
    }

    fn reference_cell(&self) -> ReferenceCell {
        self.reference_cell
    }

    fn vertex(&self, index: usize) -> Point<T, SPACEDIM> {
        self.vertices[index]
    }

    fn direction_flag(&self) -> bool {
        self.direction_flag
    }

    fn has_children(&self) -> bool {
        self.has_children
    }

    fn face_index(&self, face_no: usize) -> usize {
        self.faces[face_no].index
    }

    fn face_n_children(&self, face_no: usize) -> usize {
        self.faces[face_no].children.len()
    }

    fn n_subfaces(&self, face_no: usize) -> usize {
        self.faces[face_no].n_subfaces
    }

    fn subface_index(&self, face_no: usize, subface_no: usize) -> usize {
        self.faces[face_no].children[subface_no]
    }

    fn element_data(&self) -> Option<ElementData> {
        self.dofs.as_ref().map(|dofs| dofs.element_data)
    }

    fn n_global_dofs(&self) -> Option<usize> {
        self.dofs.as_ref().map(|dofs| dofs.n_global_dofs)
    }

    fn populate_dof_indices(&self, indices: &mut [usize]) {
        if let Some(dofs) = &self.dofs {
            indices.copy_from_slice(&dofs.indices);
        }
    }
}
