use anyhow::Result;
use hadron_box_common::{LatticeConfig, LatticeUpdateConfig, ThreeVector};

/// When a lattice is refreshed during the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatticeUpdate {
    AtOutput,
    EveryTimestep,
}

impl From<LatticeUpdateConfig> for LatticeUpdate {
    fn from(c: LatticeUpdateConfig) -> Self {
        match c {
            LatticeUpdateConfig::AtOutput => LatticeUpdate::AtOutput,
            LatticeUpdateConfig::EveryTimestep => LatticeUpdate::EveryTimestep,
        }
    }
}

/// A regular 3D grid of nodes of type `T` covering `[origin, origin + sizes)`.
///
/// Nodes are stored with x running fastest. Cell `(ix, iy, iz)` has its
/// centre at `origin + (i + 0.5) * cell_size` in each direction.
#[derive(Debug, Clone)]
pub struct RectangularLattice<T> {
    origin: [f64; 3],
    n_cells: [usize; 3],
    cell_sizes: [f64; 3],
    periodic: bool,
    when_update: LatticeUpdate,
    cells: Vec<T>,
}

impl<T: Default + Clone> RectangularLattice<T> {
    pub fn new(
        origin: [f64; 3],
        sizes: [f64; 3],
        n_cells: [usize; 3],
        periodic: bool,
        when_update: LatticeUpdate,
    ) -> Result<Self> {
        if n_cells.iter().any(|&n| n == 0) {
            anyhow::bail!("Lattice needs at least one cell per direction, got {:?}.", n_cells);
        }
        if sizes.iter().any(|&s| s <= 0.0) {
            anyhow::bail!("Lattice sizes must be positive, got {:?}.", sizes);
        }
        let cell_sizes = [
            sizes[0] / n_cells[0] as f64,
            sizes[1] / n_cells[1] as f64,
            sizes[2] / n_cells[2] as f64,
        ];
        let total = n_cells[0] * n_cells[1] * n_cells[2];
        Ok(Self {
            origin,
            n_cells,
            cell_sizes,
            periodic,
            when_update,
            cells: vec![T::default(); total],
        })
    }

    pub fn from_config(config: &LatticeConfig) -> Result<Self> {
        Self::new(
            config.origin,
            config.sizes,
            config.cell_numbers,
            config.periodic,
            config.update.into(),
        )
    }

    /// Sets every node back to its default value.
    pub fn reset(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = T::default());
    }
}

impl<T> RectangularLattice<T> {
    #[inline(always)]
    pub fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        ix + self.n_cells[0] * (iy + self.n_cells[1] * iz)
    }

    #[inline(always)]
    pub fn cell_center(&self, ix: usize, iy: usize, iz: usize) -> ThreeVector {
        ThreeVector::new(
            self.origin[0] + (ix as f64 + 0.5) * self.cell_sizes[0],
            self.origin[1] + (iy as f64 + 0.5) * self.cell_sizes[1],
            self.origin[2] + (iz as f64 + 0.5) * self.cell_sizes[2],
        )
    }

    pub fn cell_volume(&self) -> f64 {
        self.cell_sizes[0] * self.cell_sizes[1] * self.cell_sizes[2]
    }

    pub fn when_update(&self) -> LatticeUpdate {
        self.when_update
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn node(&self, ix: usize, iy: usize, iz: usize) -> &T {
        &self.cells[self.index(ix, iy, iz)]
    }

    /// Node by flat index, as handed out by [`Self::cells_in_radius`].
    pub fn node_at_mut(&mut self, flat: usize) -> &mut T {
        &mut self.cells[flat]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.cells.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.cells.iter_mut()
    }

    /// Calls `f(flat_index, [ix, iy, iz], center)` for every cell whose centre
    /// lies within `radius` of `point`.
    ///
    /// On a periodic lattice the distance is taken to the periodic image of the
    /// cell closest to the range being scanned, `center` is that image's centre
    /// and the indices are wrapped into the primary lattice. A cell can be
    /// visited more than once if `2 * radius` exceeds the lattice size.
    pub fn cells_in_radius<F>(&self, point: ThreeVector, radius: f64, mut f: F)
    where
        F: FnMut(usize, [usize; 3], ThreeVector),
    {
        let p = point.to_array();
        let mut lo = [0i64; 3];
        let mut hi = [0i64; 3];
        for d in 0..3 {
            let rel = p[d] - self.origin[d];
            lo[d] = ((rel - radius) / self.cell_sizes[d] - 0.5).ceil() as i64;
            hi[d] = ((rel + radius) / self.cell_sizes[d] - 0.5).floor() as i64;
            if !self.periodic {
                lo[d] = lo[d].max(0);
                hi[d] = hi[d].min(self.n_cells[d] as i64 - 1);
            }
            if lo[d] > hi[d] {
                return;
            }
        }

        let radius_sqr = radius * radius;
        for iz in lo[2]..=hi[2] {
            for iy in lo[1]..=hi[1] {
                for ix in lo[0]..=hi[0] {
                    let center = ThreeVector::new(
                        self.origin[0] + (ix as f64 + 0.5) * self.cell_sizes[0],
                        self.origin[1] + (iy as f64 + 0.5) * self.cell_sizes[1],
                        self.origin[2] + (iz as f64 + 0.5) * self.cell_sizes[2],
                    );
                    if center.distance_squared(point) > radius_sqr {
                        continue;
                    }
                    let wrapped = [
                        ix.rem_euclid(self.n_cells[0] as i64) as usize,
                        iy.rem_euclid(self.n_cells[1] as i64) as usize,
                        iz.rem_euclid(self.n_cells[2] as i64) as usize,
                    ];
                    let flat = self.index(wrapped[0], wrapped[1], wrapped[2]);
                    f(flat, wrapped, center);
                }
            }
        }
    }
}
