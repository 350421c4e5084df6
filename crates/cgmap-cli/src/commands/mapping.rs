use crate::cli::{MappingArgs, MappingCommands};
use crate::error::{CliError, Result};
use cgmap::core::mapping::definition::MoleculeMapping;
use itertools::Itertools;
use std::fmt::Write;
use std::path::Path;
use tracing::info;

pub fn run(args: MappingArgs) -> Result<()> {
    match args.command {
        MappingCommands::Show { file } => {
            let mapping = MoleculeMapping::load(&file)?;
            print!("{}", describe(&mapping));
            Ok(())
        }
        MappingCommands::Convert { input, output } => convert(&input, &output),
    }
}

fn describe(mapping: &MoleculeMapping) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Residue: {}", mapping.name);
    let _ = writeln!(
        out,
        "Bead types: {}",
        mapping.bead_types().into_iter().join(", ")
    );
    let _ = writeln!(out, "Beads ({}):", mapping.n_beads());
    for bead in &mapping.beads {
        let _ = writeln!(
            out,
            "  {:>3}  {:<6} atoms {}",
            bead.index,
            bead.bead_type,
            bead.atom_indices.iter().join(" ")
        );
    }
    let _ = writeln!(out, "Bonds ({}):", mapping.bonds.len());
    for (i, j) in &mapping.bonds {
        let _ = writeln!(out, "  {i} - {j}");
    }
    out
}

fn convert(input: &Path, output: &Path) -> Result<()> {
    let mapping = MoleculeMapping::load(input)?;
    let content = mapping.to_toml_string().map_err(|e| CliError::FileWriting {
        path: output.to_path_buf(),
        source: e.into(),
    })?;
    std::fs::write(output, content).map_err(|e| CliError::FileWriting {
        path: output.to_path_buf(),
        source: e.into(),
    })?;
    info!("Converted mapping '{}' to {:?}", mapping.name, output);
    println!(
        "Mapping '{}' ({} beads) written to {}",
        mapping.name,
        mapping.n_beads(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const BUTANE_MAP: &str = "\
1 : C1 : 2 3
0 : C1 : 0 1
bond : 0 1
";

    #[test]
    fn describe_lists_beads_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BUT.map");
        fs::write(&path, BUTANE_MAP).unwrap();
        let mapping = MoleculeMapping::load(&path).unwrap();

        let text = describe(&mapping);
        assert!(text.starts_with("Residue: BUT\n"));
        assert!(text.contains("Bead types: C1\n"));
        assert!(text.contains("Beads (2):"));
        assert!(text.contains("Bonds (1):\n  0 - 1\n"));
        let first = text.find("atoms 0 1").unwrap();
        let second = text.find("atoms 2 3").unwrap();
        assert!(first < second);
    }

    #[test]
    fn convert_writes_an_equivalent_toml_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("BUT.map");
        let output = dir.path().join("but.toml");
        fs::write(&input, BUTANE_MAP).unwrap();

        convert(&input, &output).unwrap();

        let original = MoleculeMapping::load(&input).unwrap();
        let converted = MoleculeMapping::load(&output).unwrap();
        assert_eq!(converted, original);
    }

    #[test]
    fn xml_mappings_convert_to_toml() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("BUT.xml");
        let output = dir.path().join("but.toml");
        fs::write(
            &input,
            r#"<Mapping>
  <Molecule name="BUT">
    <Beads n_beads="2">
      <Bead index="0" beadtype="C1" map="0 1"/>
      <Bead index="1" beadtype="C1" map="2 3"/>
    </Beads>
    <Bonds n_bonds="1">
      <Bond bead1="0" bead2="1"/>
    </Bonds>
  </Molecule>
</Mapping>
"#,
        )
        .unwrap();
        let map_input = dir.path().join("BUT.map");
        fs::write(&map_input, BUTANE_MAP).unwrap();

        convert(&input, &output).unwrap();

        let converted = MoleculeMapping::load(&output).unwrap();
        assert_eq!(converted, MoleculeMapping::load(&map_input).unwrap());
    }

    #[test]
    fn unsupported_extension_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("BUT.json");
        fs::write(&input, "{}").unwrap();
        assert!(matches!(
            convert(&input, &dir.path().join("out.toml")),
            Err(CliError::Mapping(_))
        ));
    }
}
