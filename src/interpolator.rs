use ndarray::ArrayView3;

pub struct Interpolator;

impl Interpolator {
    /// Lattice value at `(i, j, k)`, zero outside the grid.
    #[inline]
    fn corner(data: &ArrayView3<f32>, i: i64, j: i64, k: i64) -> f64 {
        let (depth, height, width) = data.dim();
        match (usize::try_from(i), usize::try_from(j), usize::try_from(k)) {
            (Ok(x), Ok(y), Ok(z)) if x < width && y < height && z < depth => {
                f64::from(data[[z, y, x]])
            }
            _ => 0.0,
        }
    }

    /// Sample a scalar grid at fractional voxel coordinates.
    ///
    /// `data` is indexed `[z, y, x]`; `(x, y, z)` are in native axis order.
    /// Corners outside the grid contribute zero.
    #[inline]
    pub fn trilinear_interpolate(data: &ArrayView3<f32>, x: f64, y: f64, z: f64) -> f64 {
        let (x0, y0, z0) = (x.floor(), y.floor(), z.floor());
        let (i, j, k) = (x0 as i64, y0 as i64, z0 as i64);

        let v000 = Self::corner(data, i, j, k);
        let v100 = Self::corner(data, i + 1, j, k);
        let v010 = Self::corner(data, i, j + 1, k);
        let v110 = Self::corner(data, i + 1, j + 1, k);
        let v001 = Self::corner(data, i, j, k + 1);
        let v101 = Self::corner(data, i + 1, j, k + 1);
        let v011 = Self::corner(data, i, j + 1, k + 1);
        let v111 = Self::corner(data, i + 1, j + 1, k + 1);

        let dx = x - x0;
        let dy = y - y0;
        let dz = z - z0;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;
        let one_minus_dz = 1.0 - dz;

        v000 * one_minus_dx * one_minus_dy * one_minus_dz
            + v100 * dx * one_minus_dy * one_minus_dz
            + v010 * one_minus_dx * dy * one_minus_dz
            + v110 * dx * dy * one_minus_dz
            + v001 * one_minus_dx * one_minus_dy * dz
            + v101 * dx * one_minus_dy * dz
            + v011 * one_minus_dx * dy * dz
            + v111 * dx * dy * dz
    }
}
