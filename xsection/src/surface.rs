use demgrid::Grid;
use geo::geometry::{Coord, MultiPolygon};

/// A continuous elevation surface sampled by the engine.
///
/// Elevations are in the project's elevation units.
pub trait Surface {
    /// Elevation at `coord`, or `None` outside the data extent.
    fn elevation(&self, coord: Coord<f64>) -> Option<f64>;

    /// Region where the surface holds data.
    fn footprint(&self) -> &MultiPolygon<f64>;

    /// Spacing at which lines are densified before sampling.
    fn sample_spacing(&self) -> f64;

    fn name(&self) -> &str {
        "surface"
    }
}

impl Surface for Grid {
    fn elevation(&self, coord: Coord<f64>) -> Option<f64> {
        self.interpolate(coord)
    }

    fn footprint(&self) -> &MultiPolygon<f64> {
        Grid::footprint(self)
    }

    fn sample_spacing(&self) -> f64 {
        self.cell_size()
    }
}

/// Attaches a display name to a surface.
pub struct NamedSurface<S> {
    name: String,
    surface: S,
}

impl<S: Surface> NamedSurface<S> {
    pub fn new(name: impl Into<String>, surface: S) -> Self {
        Self {
            name: name.into(),
            surface,
        }
    }
}

impl<S: Surface> Surface for NamedSurface<S> {
    fn elevation(&self, coord: Coord<f64>) -> Option<f64> {
        self.surface.elevation(coord)
    }

    fn footprint(&self) -> &MultiPolygon<f64> {
        self.surface.footprint()
    }

    fn sample_spacing(&self) -> f64 {
        self.surface.sample_spacing()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::{NamedSurface, Surface};
    use approx::assert_relative_eq;
    use demgrid::Grid;
    use geo::{coord, Area};

    #[test]
    fn test_grid_surface() {
        let grid = Grid::from_samples(
            coord! { x: 0.0, y: 0.0 },
            10.0,
            (2, 2),
            None,
            vec![40.0, 40.0, 20.0, 20.0],
        )
        .unwrap();
        let surface = NamedSurface::new("topo", grid);
        assert_eq!(surface.name(), "topo");
        assert_relative_eq!(surface.sample_spacing(), 10.0);
        assert_relative_eq!(surface.elevation(coord! { x: 10.0, y: 10.0 }).unwrap(), 30.0);
        assert_eq!(surface.elevation(coord! { x: 25.0, y: 5.0 }), None);
        assert_relative_eq!(surface.footprint().unsigned_area(), 400.0);
    }
}
