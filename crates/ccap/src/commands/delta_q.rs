//! ΔQ between two POSCAR files, optionally projecting an intermediate one.

use std::path::Path;

use anyhow::{Context, Result};
use ccap_geom::{delta_q, project, DeltaQ, Poscar, Projection};

fn read(path: &Path) -> Result<Poscar> {
    Poscar::from_file(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn report(result: &DeltaQ, projection: Option<&Projection>) -> String {
    let unit = if result.weighted { "amu^1/2 Å" } else { "Å" };
    let mut out = format!("Delta Q: {:.6} {}\n", result.delta_q, unit);
    if let Some(p) = projection {
        out.push_str(&format!("Projected delta Q: {:.6} {}\n", p.projected_delta_q, unit));
        out.push_str(&format!("Fractional displacement: {:.6}\n", p.fraction));
    }
    out
}

/// Run the delta-q command.
pub fn run(initial: &Path, final_: &Path, intermediate: Option<&Path>, weighted: bool) -> Result<()> {
    let start = read(initial)?;
    let end = read(final_)?;
    tracing::debug!("{} sites in {}", start.num_sites(), initial.display());

    let result = delta_q(&start, &end, weighted)?;
    let projection = match intermediate {
        Some(path) => Some(project(&start, &result, &read(path)?)?),
        None => None,
    };

    print!("{}", report(&result, projection.as_ref()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    const INITIAL: &str = "CdTe\n1.0\n10 0 0\n0 10 0\n0 0 10\nCd Te\n1 1\nDirect\n0 0 0\n0.5 0.5 0.5\n";
    const FINAL: &str = "CdTe\n1.0\n10 0 0\n0 10 0\n0 0 10\nCd Te\n1 1\nDirect\n0.1 0 0\n0.5 0.5 0.5\n";

    #[test]
    fn reports_unweighted_displacement() {
        let result = delta_q(
            &Poscar::parse(INITIAL).unwrap(),
            &Poscar::parse(FINAL).unwrap(),
            false,
        )
        .unwrap();

        assert_eq!(report(&result, None), "Delta Q: 1.000000 Å\n");
    }

    #[test]
    fn reports_projection() {
        let initial = Poscar::parse(INITIAL).unwrap();
        let result = delta_q(&initial, &Poscar::parse(FINAL).unwrap(), false).unwrap();
        let middle = INITIAL.replace("\n0 0 0\n", "\n0.025 0 0\n");
        let projection = project(&initial, &result, &Poscar::parse(&middle).unwrap()).unwrap();

        let text = report(&result, Some(&projection));

        assert!(text.contains("Projected delta Q: 0.250000 Å"));
        assert!(text.contains("Fractional displacement: 0.250000"));
    }

    #[test]
    fn run_reads_files() {
        let temp = tempdir().unwrap();
        let initial = temp.path().join("POSCAR_i");
        let final_ = temp.path().join("POSCAR_f");
        fs::write(&initial, INITIAL).unwrap();
        fs::write(&final_, FINAL).unwrap();

        assert!(run(&initial, &final_, None, true).is_ok());
        assert!(run(&initial, &temp.path().join("missing"), None, true).is_err());
    }
}
