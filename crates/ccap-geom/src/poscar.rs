//! VASP 5 POSCAR reader.

use std::fs;
use std::path::Path;

use crate::elements::atomic_mass;
use crate::GeomError;

/// Coordinate mode of the position block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinates {
    Direct,
    Cartesian,
}

/// A crystal structure read from a POSCAR file.
#[derive(Debug, Clone, PartialEq)]
pub struct Poscar {
    /// First line of the file
    pub comment: String,
    /// Lattice vectors as rows, in Å, with the scale factor applied
    pub lattice: [[f64; 3]; 3],
    /// Species symbols in file order
    pub species: Vec<String>,
    /// Number of sites of each species
    pub counts: Vec<usize>,
    /// Fractional coordinates of every site
    pub frac_coords: Vec<[f64; 3]>,
    /// Mode the positions were given in
    pub coordinates: Coordinates,
}

impl Poscar {
    /// Read a POSCAR file.
    pub fn from_file(path: &Path) -> Result<Self, GeomError> {
        let content = fs::read_to_string(path).map_err(|e| GeomError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let poscar = Self::parse(&content)?;
        tracing::debug!(
            "Read {} sites ({}) from {}",
            poscar.num_sites(),
            poscar.species.join(" "),
            path.display()
        );
        Ok(poscar)
    }

    /// Parse POSCAR contents.
    pub fn parse(content: &str) -> Result<Self, GeomError> {
        let mut lines = Lines::new(content);

        let comment = lines.next("comment")?.trim().to_string();

        let (scale_line, scale_text) = lines.next_numbered("scale factor")?;
        let scale = parse_floats(scale_text, scale_line)?;

        let mut lattice = [[0.0; 3]; 3];
        for row in lattice.iter_mut() {
            let (n, text) = lines.next_numbered("lattice vector")?;
            *row = first_three(&parse_floats(text, n)?, n)?;
        }

        let factor = match scale.as_slice() {
            [s] if *s < 0.0 => {
                let volume = determinant(&lattice).abs();
                if volume == 0.0 {
                    return Err(malformed(scale_line, "lattice vectors are degenerate"));
                }
                [(s.abs() / volume).cbrt(); 3]
            }
            [s] if *s > 0.0 => [*s; 3],
            [a, b, c] if *a > 0.0 && *b > 0.0 && *c > 0.0 => [*a, *b, *c],
            _ => return Err(malformed(scale_line, "invalid scale factor")),
        };
        scale_rows(&mut lattice, factor);

        let (species_line, species_text) = lines.next_numbered("species")?;
        let species: Vec<String> = species_text.split_whitespace().map(str::to_string).collect();
        if species.is_empty() || species[0].parse::<f64>().is_ok() {
            return Err(malformed(
                species_line,
                "species symbols missing (VASP 4 files are not supported)",
            ));
        }

        let (counts_line, counts_text) = lines.next_numbered("species counts")?;
        let counts = counts_text
            .split_whitespace()
            .map(|t| t.parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| malformed(counts_line, "species counts must be integers"))?;
        if counts.len() != species.len() {
            return Err(malformed(
                counts_line,
                &format!("{} species but {} counts", species.len(), counts.len()),
            ));
        }

        let mut mode_text = lines.next("coordinate mode")?.trim();
        if mode_text.starts_with(['S', 's']) {
            mode_text = lines.next("coordinate mode")?.trim();
        }
        let coordinates = if mode_text.starts_with(['C', 'c', 'K', 'k']) {
            Coordinates::Cartesian
        } else {
            Coordinates::Direct
        };

        let to_fractional = match coordinates {
            Coordinates::Cartesian => Some(
                inverse(&lattice).ok_or_else(|| malformed(scale_line, "lattice vectors are degenerate"))?,
            ),
            Coordinates::Direct => None,
        };

        let total: usize = counts.iter().sum();
        let mut frac_coords = Vec::with_capacity(total);
        for _ in 0..total {
            let (n, text) = lines.next_numbered("atomic position")?;
            let mut position = first_three(&parse_leading_floats(text, n)?, n)?;
            if let Some(inverse) = &to_fractional {
                for (x, f) in position.iter_mut().zip(factor) {
                    *x *= f;
                }
                position = mul_row(&position, inverse);
            }
            frac_coords.push(position);
        }

        Ok(Self {
            comment,
            lattice,
            species,
            counts,
            frac_coords,
            coordinates,
        })
    }

    pub fn num_sites(&self) -> usize {
        self.frac_coords.len()
    }

    /// Species symbol of every site, in order.
    pub fn site_species(&self) -> Vec<&str> {
        self.species
            .iter()
            .zip(&self.counts)
            .flat_map(|(s, &n)| std::iter::repeat(s.as_str()).take(n))
            .collect()
    }

    /// Atomic mass of every site.
    pub fn site_masses(&self) -> Result<Vec<f64>, GeomError> {
        self.site_species()
            .into_iter()
            .map(|s| atomic_mass(s).ok_or_else(|| GeomError::UnknownElement(s.to_string())))
            .collect()
    }

    /// Convert a fractional vector to Cartesian Å.
    pub fn to_cartesian(&self, frac: &[f64; 3]) -> [f64; 3] {
        mul_row(frac, &self.lattice)
    }

    /// Cell volume in Å³.
    pub fn volume(&self) -> f64 {
        determinant(&self.lattice).abs()
    }
}

/// Line reader that remembers 1-indexed line numbers.
struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Lines<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            inner: content.lines().enumerate(),
        }
    }

    fn next(&mut self, what: &str) -> Result<&'a str, GeomError> {
        self.next_numbered(what).map(|(_, line)| line)
    }

    fn next_numbered(&mut self, what: &str) -> Result<(usize, &'a str), GeomError> {
        match self.inner.next() {
            Some((i, line)) => Ok((i + 1, line)),
            None => Err(GeomError::Malformed {
                line: 0,
                message: format!("unexpected end of file, expected {}", what),
            }),
        }
    }
}

fn malformed(line: usize, message: &str) -> GeomError {
    GeomError::Malformed {
        line,
        message: message.to_string(),
    }
}

fn parse_floats(text: &str, line: usize) -> Result<Vec<f64>, GeomError> {
    text.split_whitespace()
        .map(|t| t.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| malformed(line, &format!("expected numbers, found '{}'", text.trim())))
}

/// Numbers at the start of a line; selective dynamics flags and labels follow them.
fn parse_leading_floats(text: &str, line: usize) -> Result<Vec<f64>, GeomError> {
    let values: Vec<f64> = text
        .split_whitespace()
        .map_while(|t| t.parse::<f64>().ok())
        .collect();
    if values.len() < 3 {
        return Err(malformed(line, &format!("expected a position, found '{}'", text.trim())));
    }
    Ok(values)
}

fn first_three(values: &[f64], line: usize) -> Result<[f64; 3], GeomError> {
    match values {
        [x, y, z, ..] => Ok([*x, *y, *z]),
        _ => Err(malformed(line, "expected three components")),
    }
}

fn scale_rows(lattice: &mut [[f64; 3]; 3], factor: [f64; 3]) {
    for row in lattice.iter_mut() {
        for (x, f) in row.iter_mut().zip(factor) {
            *x *= f;
        }
    }
}

fn mul_row(v: &[f64; 3], m: &[[f64; 3]; 3]) -> [f64; 3] {
    let mut out = [0.0; 3];
    for (j, o) in out.iter_mut().enumerate() {
        *o = v[0] * m[0][j] + v[1] * m[1][j] + v[2] * m[2][j];
    }
    out
}

fn determinant(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]) - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn inverse(m: &[[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let det = determinant(m);
    if det.abs() < 1e-12 {
        return None;
    }
    let mut inv = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            let (a, b) = ((j + 1) % 3, (j + 2) % 3);
            let (c, d) = ((i + 1) % 3, (i + 2) % 3);
            inv[i][j] = (m[a][c] * m[b][d] - m[a][d] * m[b][c]) / det;
        }
    }
    Some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CDTE: &str = "Cd Te zinc blende
   6.48
     1.0 0.0 0.0
     0.0 1.0 0.0
     0.0 0.0 1.0
   Cd Te
   1 1
Direct
  0.00 0.00 0.00
  0.25 0.25 0.25
";

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn parses_direct_coordinates() {
        let poscar = Poscar::parse(CDTE).unwrap();

        assert_eq!(poscar.comment, "Cd Te zinc blende");
        assert_eq!(poscar.species, vec!["Cd", "Te"]);
        assert_eq!(poscar.counts, vec![1, 1]);
        assert_eq!(poscar.coordinates, Coordinates::Direct);
        assert_eq!(poscar.frac_coords[1], [0.25, 0.25, 0.25]);
        assert!(close(poscar.lattice[0][0], 6.48));
        assert_eq!(poscar.site_species(), vec!["Cd", "Te"]);
        assert!(close(poscar.to_cartesian(&[0.5, 0.0, 0.0])[0], 3.24));
    }

    #[test]
    fn negative_scale_is_a_volume() {
        let source = "cube\n-64\n2 0 0\n0 2 0\n0 0 2\nH\n1\nDirect\n0 0 0\n";
        let poscar = Poscar::parse(source).unwrap();

        assert!(close(poscar.volume(), 64.0));
        assert!(close(poscar.lattice[1][1], 4.0));
    }

    #[test]
    fn cartesian_positions_become_fractional() {
        let source = "cube\n2.0\n2 0 0\n0 2 0\n0 0 2\nH O\n1 1\nCartesian\n0 0 0\n1 0.5 1\n";
        let poscar = Poscar::parse(source).unwrap();

        assert_eq!(poscar.coordinates, Coordinates::Cartesian);
        let frac = poscar.frac_coords[1];
        assert!(close(frac[0], 0.5) && close(frac[1], 0.25) && close(frac[2], 0.5));
    }

    #[test]
    fn skips_selective_dynamics_flags() {
        let source = "sd\n1.0\n5 0 0\n0 5 0\n0 0 5\nZn O\n1 1\nSelective dynamics\nDirect\n0.1 0.2 0.3 T T F\n0.5 0.5 0.5 F F F\n";
        let poscar = Poscar::parse(source).unwrap();

        assert_eq!(poscar.frac_coords[0], [0.1, 0.2, 0.3]);
        assert_eq!(poscar.num_sites(), 2);
    }

    #[test]
    fn rejects_vasp4_files() {
        let source = "old\n1.0\n5 0 0\n0 5 0\n0 0 5\n1 1\nDirect\n0 0 0\n0.5 0.5 0.5\n";
        let err = Poscar::parse(source).unwrap_err();

        assert!(matches!(err, GeomError::Malformed { line: 6, .. }));
    }

    #[test]
    fn rejects_truncated_files() {
        let source = "short\n1.0\n5 0 0\n0 5 0\n0 0 5\nZn O\n1 1\nDirect\n0 0 0\n";
        assert!(matches!(
            Poscar::parse(source),
            Err(GeomError::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_count_mismatch() {
        let source = "bad\n1.0\n5 0 0\n0 5 0\n0 0 5\nZn O\n1\nDirect\n0 0 0\n";
        assert!(matches!(
            Poscar::parse(source),
            Err(GeomError::Malformed { line: 7, .. })
        ));
    }

    #[test]
    fn unknown_element_masses() {
        let source = "x\n1.0\n5 0 0\n0 5 0\n0 0 5\nXx\n1\nDirect\n0 0 0\n";
        let poscar = Poscar::parse(source).unwrap();

        assert!(matches!(poscar.site_masses(), Err(GeomError::UnknownElement(s)) if s == "Xx"));
    }

    #[test]
    fn reads_files() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("POSCAR_i");
        fs::write(&path, CDTE).unwrap();

        assert_eq!(Poscar::from_file(&path).unwrap().num_sites(), 2);
        assert!(matches!(
            Poscar::from_file(&temp.path().join("missing")),
            Err(GeomError::Read { .. })
        ));
    }
}
