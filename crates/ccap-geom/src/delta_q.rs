//! Mass-weighted configuration-coordinate displacement between two geometries.

use crate::poscar::Poscar;
use crate::GeomError;

/// ΔQ between an initial and a final structure.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaQ {
    /// ΔQ in amu^1/2·Å (Å when unweighted)
    pub delta_q: f64,
    /// Cartesian displacement of every site, in Å
    pub displacements: Vec<[f64; 3]>,
    /// Site masses used for weighting
    pub masses: Vec<f64>,
    pub weighted: bool,
}

/// Position of an intermediate structure along the initial → final path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Average fractional displacement along ΔR
    pub fraction: f64,
    /// ΔQ scaled by the fraction
    pub projected_delta_q: f64,
    /// Sites that took part in the average
    pub sites: usize,
}

/// Compute ΔQ = sqrt(Σ m_i |Δr_i|²), with `m_i = 1` when `weighted` is false.
///
/// Fractional differences are wrapped into [-0.5, 0.5) and converted with the
/// lattice of the initial structure.
pub fn delta_q(initial: &Poscar, final_: &Poscar, weighted: bool) -> Result<DeltaQ, GeomError> {
    check_compatible(initial, final_, "final")?;

    let masses = initial.site_masses()?;
    let displacements = displacements(initial, final_);

    let sum: f64 = displacements
        .iter()
        .zip(&masses)
        .map(|(d, &m)| {
            let weight = if weighted { m } else { 1.0 };
            weight * norm_squared(d)
        })
        .sum();

    Ok(DeltaQ {
        delta_q: sum.sqrt(),
        displacements,
        masses,
        weighted,
    })
}

/// Project an intermediate structure onto the displacement of `result`.
///
/// Per site, the intermediate displacement ΔM is projected onto ΔR and divided
/// by |ΔR|; the fractions are averaged with `sqrt(m_i)` weights (equal weights
/// when unweighted). Sites that do not move between initial and final are left out.
pub fn project(initial: &Poscar, result: &DeltaQ, intermediate: &Poscar) -> Result<Projection, GeomError> {
    check_compatible(initial, intermediate, "intermediate")?;

    let delta_m = displacements(initial, intermediate);

    let mut total = 0.0;
    let mut weights = 0.0;
    let mut sites = 0;
    for ((dr, dm), &mass) in result.displacements.iter().zip(&delta_m).zip(&result.masses) {
        let norm = norm_squared(dr).sqrt();
        if norm == 0.0 {
            continue;
        }
        let fraction = dot(dr, dm) / norm / norm;
        let weight = if result.weighted { mass.sqrt() } else { 1.0 };
        total += weight * fraction;
        weights += weight;
        sites += 1;
    }

    if sites == 0 {
        tracing::warn!("Initial and final structures are identical, projection is undefined");
        return Ok(Projection {
            fraction: 0.0,
            projected_delta_q: 0.0,
            sites,
        });
    }

    let fraction = total / weights;
    Ok(Projection {
        fraction,
        projected_delta_q: result.delta_q * fraction,
        sites,
    })
}

fn check_compatible(initial: &Poscar, other: &Poscar, label: &str) -> Result<(), GeomError> {
    if initial.num_sites() != other.num_sites() {
        return Err(GeomError::Mismatch(format!(
            "initial structure has {} sites, {} has {}",
            initial.num_sites(),
            label,
            other.num_sites()
        )));
    }
    if initial.site_species() != other.site_species() {
        return Err(GeomError::Mismatch(format!(
            "species differ between initial ({}) and {} ({})",
            initial.species.join(" "),
            label,
            other.species.join(" ")
        )));
    }
    Ok(())
}

/// Cartesian displacements under periodic wrapping.
fn displacements(from: &Poscar, to: &Poscar) -> Vec<[f64; 3]> {
    from.frac_coords
        .iter()
        .zip(&to.frac_coords)
        .map(|(a, b)| {
            let wrapped = [wrap(b[0] - a[0]), wrap(b[1] - a[1]), wrap(b[2] - a[2])];
            from.to_cartesian(&wrapped)
        })
        .collect()
}

fn wrap(x: f64) -> f64 {
    (x + 0.5).rem_euclid(1.0) - 0.5
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn norm_squared(a: &[f64; 3]) -> f64 {
    dot(a, a)
}
