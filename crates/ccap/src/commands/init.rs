//! Scaffold the documentation sources.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Run the init command.
///
/// Files are written next to `config_path`; existing files are kept unless `force` is set.
pub fn run(config_path: &Path, force: bool) -> Result<()> {
    let root = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let files = [
        (config_path.to_path_buf(), DEFAULT_CONFIG),
        (root.join("src/index.md"), DEFAULT_INDEX),
        (root.join("src/lib/public.md"), DEFAULT_PUBLIC),
        (root.join("src/lib/brooglie.md"), DEFAULT_BROOGLIE),
    ];

    let mut written = 0;
    for (path, content) in &files {
        if path.exists() && !force {
            tracing::warn!("{} already exists, use --force to overwrite", path.display());
            continue;
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Created {}", path.display());
        written += 1;
    }

    tracing::info!("Wrote {} files. Run 'ccap dev' to preview the documentation.", written);
    Ok(())
}

const DEFAULT_CONFIG: &str = r#"sitename = "CarrierCapture.jl"
source = "src"
build = "build"

[[modules]]
name = "CarrierCapture"
path = "../src"

[[pages]]
"Home" = "index.md"

[[pages]]
"Library" = [
    { "Public" = "lib/public.md" },
    { "Brooglie" = "lib/brooglie.md" },
]

[deploy]
repo = "github.com/WMD-group/CarrierCapture.jl.git"
"#;

const DEFAULT_INDEX: &str = r#"# CarrierCapture.jl

Anharmonic calculation of carrier capture rates from first principles.

```@contents
Pages = ["lib/public.md", "lib/brooglie.md"]
Depth = 2
```
"#;

const DEFAULT_PUBLIC: &str = r#"# Public

Documentation for the exported interface of `CarrierCapture`.

## Contents

```@contents
Pages = ["public.md"]
```

## Index

```@index
Pages = ["public.md"]
```

## Potentials

```@docs
Potential
fit_pot!
```

## Capture

```@docs
conf_coord
calc_capt_coeff
```
"#;

const DEFAULT_BROOGLIE: &str = r#"# Brooglie

Solver for the one-dimensional Schrödinger equation.

```@docs
CarrierCapture.Brooglie.solve
```
"#;
