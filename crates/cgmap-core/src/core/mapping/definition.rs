use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::io::{self, BufRead};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io { path: String, source: io::Error },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("XML parsing error for '{path}': {source}")]
    Xml {
        path: String,
        source: roxmltree::Error,
    },
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: MappingParseErrorKind,
    },
    #[error("Unsupported mapping file extension for '{0}' (expected .map, .xml or .toml)")]
    UnsupportedExtension(String),
    #[error("Invalid mapping '{name}': {kind}")]
    Invalid {
        name: String,
        kind: MappingValidationError,
    },
    #[error("Duplicate mapping for residue '{0}'")]
    DuplicateResidue(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingParseErrorKind {
    #[error("Expected 'index : bead_type : atom indices' or 'bond : i j'")]
    MalformedLine,
    #[error("Invalid index '{0}'")]
    InvalidIndex(String),
    #[error("Bond line requires exactly two bead indices")]
    InvalidBond,
    #[error("Missing <{0}> element")]
    MissingElement(&'static str),
    #[error("Missing '{0}' attribute")]
    MissingAttribute(&'static str),
    #[error("Unexpected <{0}> element")]
    UnexpectedElement(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingValidationError {
    #[error("Mapping has no beads")]
    NoBeads,
    #[error("Bead indices must be exactly 0..{expected}, found {found:?}")]
    NonContiguousIndices { expected: usize, found: Vec<usize> },
    #[error("Bead {0} maps no atoms")]
    EmptyBead(usize),
    #[error("Bond {0}-{1} references a bead that does not exist")]
    UnknownBondBead(usize, usize),
    #[error("Bead {0} is bonded to itself")]
    SelfBond(usize),
}

/// One coarse-grained bead of a molecule mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BeadDefinition {
    /// Position of the bead within its molecule.
    pub index: usize,
    pub bead_type: String,
    /// Residue-local indices of the atoms grouped into this bead.
    #[serde(rename = "atoms")]
    pub atom_indices: Vec<usize>,
}

/// Forward mapping for one residue type: which atoms form which beads, and
/// which beads are bonded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoleculeMapping {
    /// Residue name this mapping applies to.
    pub name: String,
    #[serde(default)]
    pub bonds: Vec<(usize, usize)>,
    pub beads: Vec<BeadDefinition>,
}

impl MoleculeMapping {
    /// Loads a mapping, choosing the format from the file extension.
    ///
    /// `.map` files carry no residue name; the file stem is used instead, as
    /// it is for `.xml` files whose `<Molecule>` has no `name` attribute.
    pub fn load(path: &Path) -> Result<Self, MappingLoadError> {
        let path_str = path.to_string_lossy().to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let mapping = match extension.as_deref() {
            Some("map") => {
                let file = std::fs::File::open(path).map_err(|e| MappingLoadError::Io {
                    path: path_str.clone(),
                    source: e,
                })?;
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                Self::read_map(&mut io::BufReader::new(file), &name)?
            }
            Some("xml") => {
                let content = std::fs::read_to_string(path).map_err(|e| MappingLoadError::Io {
                    path: path_str.clone(),
                    source: e,
                })?;
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                Self::read_xml(&content, &name).map_err(|e| match e {
                    MappingLoadError::Xml { source, .. } => MappingLoadError::Xml {
                        path: path_str.clone(),
                        source,
                    },
                    other => other,
                })?
            }
            Some("toml") => {
                let content = std::fs::read_to_string(path).map_err(|e| MappingLoadError::Io {
                    path: path_str.clone(),
                    source: e,
                })?;
                toml::from_str::<Self>(&content).map_err(|e| MappingLoadError::Toml {
                    path: path_str.clone(),
                    source: e,
                })?
            }
            _ => return Err(MappingLoadError::UnsupportedExtension(path_str)),
        };

        mapping.validated()
    }

    /// Parses the colon-delimited `.map` format.
    ///
    /// ```text
    /// 0 : P4 : 0 1 2 3
    /// 1 : C1 : 4 5 6
    /// bond : 0 1
    /// ```
    pub fn read_map(reader: &mut impl BufRead, name: &str) -> Result<Self, MappingLoadError> {
        let mut beads = Vec::new();
        let mut bonds = Vec::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res.map_err(|e| MappingLoadError::Io {
                path: name.to_string(),
                source: e,
            })?;
            let line_number = line_num + 1;
            if line.trim().is_empty() {
                continue;
            }

            let parse_error = |kind| MappingLoadError::Parse {
                line: line_number,
                kind,
            };
            let fields: Vec<&str> = line.split(':').map(str::trim).collect();

            if fields[0].contains("bond") {
                let indices = fields
                    .get(1)
                    .ok_or_else(|| parse_error(MappingParseErrorKind::InvalidBond))?
                    .split_whitespace()
                    .map(parse_index)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(parse_error)?;
                match indices.as_slice() {
                    [i, j] => bonds.push((*i, *j)),
                    _ => return Err(parse_error(MappingParseErrorKind::InvalidBond)),
                }
            } else {
                let [index, bead_type, atoms] = fields.as_slice() else {
                    return Err(parse_error(MappingParseErrorKind::MalformedLine));
                };
                if bead_type.is_empty() {
                    return Err(parse_error(MappingParseErrorKind::MalformedLine));
                }
                let atom_indices = atoms
                    .split_whitespace()
                    .map(parse_index)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(parse_error)?;
                beads.push(BeadDefinition {
                    index: parse_index(index).map_err(parse_error)?,
                    bead_type: bead_type.to_string(),
                    atom_indices,
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            bonds,
            beads,
        })
    }

    /// Parses the XML layout `Mapping > Molecule > Beads + Bonds`.
    ///
    /// ```text
    /// <Mapping>
    ///   <Molecule name="LIG">
    ///     <Beads n_beads="2">
    ///       <Bead index="0" beadtype="P4" map="0 1 2"/>
    ///       <Bead index="1" beadtype="C1" map="3 4 5"/>
    ///     </Beads>
    ///     <Bonds n_bonds="1">
    ///       <Bond bead1="0" bead2="1"/>
    ///     </Bonds>
    ///   </Molecule>
    /// </Mapping>
    /// ```
    ///
    /// Only the first `<Molecule>` is read. `<Bonds>` may be omitted.
    pub fn read_xml(content: &str, fallback_name: &str) -> Result<Self, MappingLoadError> {
        let document = roxmltree::Document::parse(content).map_err(|source| MappingLoadError::Xml {
            path: fallback_name.to_string(),
            source,
        })?;
        let parse_error = |node: roxmltree::Node, kind| MappingLoadError::Parse {
            line: document.text_pos_at(node.range().start).row as usize,
            kind,
        };

        let root = document.root_element();
        if root.tag_name().name() != "Mapping" {
            return Err(parse_error(
                root,
                MappingParseErrorKind::UnexpectedElement(root.tag_name().name().to_string()),
            ));
        }
        let molecule = child_element(root, "Molecule")
            .ok_or_else(|| parse_error(root, MappingParseErrorKind::MissingElement("Molecule")))?;
        let name = molecule
            .attribute("name")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(fallback_name);

        let beads_node = child_element(molecule, "Beads")
            .ok_or_else(|| parse_error(molecule, MappingParseErrorKind::MissingElement("Beads")))?;
        let mut beads = Vec::new();
        for bead in beads_node.children().filter(roxmltree::Node::is_element) {
            if bead.tag_name().name() != "Bead" {
                return Err(parse_error(
                    bead,
                    MappingParseErrorKind::UnexpectedElement(bead.tag_name().name().to_string()),
                ));
            }
            let attribute = |key: &'static str| {
                bead.attribute(key)
                    .ok_or_else(|| parse_error(bead, MappingParseErrorKind::MissingAttribute(key)))
            };
            let bead_type = attribute("beadtype")?.trim();
            if bead_type.is_empty() {
                return Err(parse_error(bead, MappingParseErrorKind::MissingAttribute("beadtype")));
            }
            let atom_indices = attribute("map")?
                .split_whitespace()
                .map(parse_index)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|kind| parse_error(bead, kind))?;
            beads.push(BeadDefinition {
                index: parse_index(attribute("index")?).map_err(|kind| parse_error(bead, kind))?,
                bead_type: bead_type.to_string(),
                atom_indices,
            });
        }

        let mut bonds = Vec::new();
        if let Some(bonds_node) = child_element(molecule, "Bonds") {
            for bond in bonds_node.children().filter(roxmltree::Node::is_element) {
                if bond.tag_name().name() != "Bond" {
                    return Err(parse_error(
                        bond,
                        MappingParseErrorKind::UnexpectedElement(bond.tag_name().name().to_string()),
                    ));
                }
                let endpoint = |key: &'static str| {
                    let value = bond
                        .attribute(key)
                        .ok_or_else(|| parse_error(bond, MappingParseErrorKind::MissingAttribute(key)))?;
                    parse_index(value).map_err(|kind| parse_error(bond, kind))
                };
                bonds.push((endpoint("bead1")?, endpoint("bead2")?));
            }
        }

        Ok(Self {
            name: name.to_string(),
            bonds,
            beads,
        })
    }

    /// Sorts beads by index and checks that indices, atoms and bonds are consistent.
    pub fn validated(mut self) -> Result<Self, MappingLoadError> {
        self.beads.sort_by_key(|bead| bead.index);
        match self.check() {
            Ok(()) => Ok(self),
            Err(kind) => Err(MappingLoadError::Invalid {
                name: self.name,
                kind,
            }),
        }
    }

    /// Checks a mapping whose beads are expected to be in index order already,
    /// so that bead `i` is `beads[i]`.
    pub fn check(&self) -> Result<(), MappingValidationError> {
        if self.beads.is_empty() {
            return Err(MappingValidationError::NoBeads);
        }
        let found: Vec<usize> = self.beads.iter().map(|bead| bead.index).collect();
        if found.iter().enumerate().any(|(expected, &index)| expected != index) {
            return Err(MappingValidationError::NonContiguousIndices {
                expected: self.beads.len(),
                found,
            });
        }
        if let Some(bead) = self.beads.iter().find(|bead| bead.atom_indices.is_empty()) {
            return Err(MappingValidationError::EmptyBead(bead.index));
        }
        if let Some(&(i, j)) = self
            .bonds
            .iter()
            .find(|&&(i, j)| i >= self.beads.len() || j >= self.beads.len())
        {
            return Err(MappingValidationError::UnknownBondBead(i, j));
        }
        if let Some(&(i, _)) = self.bonds.iter().find(|&&(i, j)| i == j) {
            return Err(MappingValidationError::SelfBond(i));
        }
        Ok(())
    }

    pub fn n_beads(&self) -> usize {
        self.beads.len()
    }

    /// Distinct bead types, sorted.
    pub fn bead_types(&self) -> BTreeSet<&str> {
        self.beads.iter().map(|bead| bead.bead_type.as_str()).collect()
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Loads several mapping files, keyed by residue name.
pub fn load_mappings<P: AsRef<Path>>(
    paths: &[P],
) -> Result<HashMap<String, MoleculeMapping>, MappingLoadError> {
    let mut mappings = HashMap::with_capacity(paths.len());
    for path in paths {
        let mapping = MoleculeMapping::load(path.as_ref())?;
        if mappings.contains_key(&mapping.name) {
            return Err(MappingLoadError::DuplicateResidue(mapping.name));
        }
        mappings.insert(mapping.name.clone(), mapping);
    }
    Ok(mappings)
}

fn child_element<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    tag: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    parent
        .children()
        .find(|node| node.is_element() && node.tag_name().name() == tag)
}

fn parse_index(value: &str) -> Result<usize, MappingParseErrorKind> {
    value
        .trim()
        .parse()
        .map_err(|_| MappingParseErrorKind::InvalidIndex(value.trim().to_string()))
}
