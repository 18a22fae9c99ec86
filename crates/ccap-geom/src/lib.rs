//! Configuration-coordinate geometry for carrier capture calculations.
//!
//! Reads VASP POSCAR structures and computes the mass-weighted displacement
//! ΔQ between an initial and a final geometry.

pub mod delta_q;
pub mod elements;
pub mod poscar;

pub use delta_q::{delta_q, project, DeltaQ, Projection};
pub use elements::atomic_mass;
pub use poscar::{Coordinates, Poscar};

/// Errors raised while reading structures or comparing them.
#[derive(Debug, thiserror::Error)]
pub enum GeomError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Malformed POSCAR (line {line}): {message}")]
    Malformed { line: usize, message: String },

    #[error("Unknown element: {0}")]
    UnknownElement(String),

    #[error("Structures do not match: {0}")]
    Mismatch(String),
}
