//! Fixture enumeration
//!
//! A category directory holds one subdirectory per test case. The
//! subdirectory name is the case identifier and fixed file names inside it
//! give each file its role. Parsing a case directory is a pure function of
//! what exists on disk, so the convention is testable without running tools.
//!
//! Comparer and converter categories are separate types, each resolving to
//! its own case layout. A converter case can only come from a converter
//! category.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

/// Comparer inputs
pub const IMAGE_1: &str = "image1.bmp";
pub const IMAGE_2: &str = "image2.bmp";
/// Expected comparer stderr for images that differ in content
pub const EXPECTED_STDERR: &str = "output.txt";

/// Converter input
pub const INPUT_IMAGE: &str = "image.bmp";
/// Converter output
pub const OUTPUT_IMAGE: &str = "image_neg.bmp";
/// What the converter output must be equal to
pub const REFERENCE_IMAGE: &str = "image_neg_reference.bmp";
/// Output of converting `OUTPUT_IMAGE` a second time
pub const OUTPUT_TWICE_IMAGE: &str = "image_neg_twice.bmp";

/// Test category, one per fixture subdirectory of the test data dir
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Comparer on identical images
    Same,
    /// Comparer on differing or incompatible images
    Diff,
    /// Converter on valid input, output checked against a reference
    Ok,
    /// Converter on invalid input
    NotOk,
    /// Converter applied twice must reproduce the input
    Twice,
}

impl Category {
    /// Name of the fixture subdirectory
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Same => "same",
            Category::Diff => "diff",
            Category::Ok => "ok",
            Category::NotOk => "not_ok",
            Category::Twice => "twice",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A family of categories and the case layout they resolve to
pub trait CaseKind: Copy + Send + Sync {
    type Files: CaseFiles;

    fn category(self) -> Category;

    /// Resolve the file roles of `case_dir`, `None` if an input is missing
    fn locate(self, case_dir: &Path) -> Option<Self::Files>;
}

/// Resolved file roles of a single case
pub trait CaseFiles: Send + Sync {
    /// Files the tool under test may create for this case
    fn artifacts(&self) -> Vec<PathBuf>;
}

/// Categories that exercise the comparer alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparerCategory {
    Same,
    Diff,
}

impl ComparerCategory {
    pub const ALL: [ComparerCategory; 2] = [ComparerCategory::Same, ComparerCategory::Diff];
}

/// Categories that exercise the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConverterCategory {
    Ok,
    NotOk,
    Twice,
}

impl ConverterCategory {
    pub const ALL: [ConverterCategory; 3] = [
        ConverterCategory::Ok,
        ConverterCategory::NotOk,
        ConverterCategory::Twice,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparerCase {
    Same {
        image1: PathBuf,
        image2: PathBuf,
    },
    Diff {
        image1: PathBuf,
        image2: PathBuf,
        expected_stderr: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConverterCase {
    Ok {
        input: PathBuf,
        output: PathBuf,
        reference: PathBuf,
    },
    NotOk {
        input: PathBuf,
        output: PathBuf,
    },
    Twice {
        input: PathBuf,
        intermediate: PathBuf,
        output: PathBuf,
    },
}

fn required(case_dir: &Path, name: &str) -> Option<PathBuf> {
    Some(case_dir.join(name)).filter(|p| p.is_file())
}

impl CaseKind for ComparerCategory {
    type Files = ComparerCase;

    fn category(self) -> Category {
        match self {
            ComparerCategory::Same => Category::Same,
            ComparerCategory::Diff => Category::Diff,
        }
    }

    fn locate(self, case_dir: &Path) -> Option<ComparerCase> {
        let image1 = required(case_dir, IMAGE_1)?;
        let image2 = required(case_dir, IMAGE_2)?;
        Some(match self {
            ComparerCategory::Same => ComparerCase::Same { image1, image2 },
            ComparerCategory::Diff => ComparerCase::Diff {
                image1,
                image2,
                expected_stderr: required(case_dir, EXPECTED_STDERR),
            },
        })
    }
}

impl CaseFiles for ComparerCase {
    fn artifacts(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

impl CaseKind for ConverterCategory {
    type Files = ConverterCase;

    fn category(self) -> Category {
        match self {
            ConverterCategory::Ok => Category::Ok,
            ConverterCategory::NotOk => Category::NotOk,
            ConverterCategory::Twice => Category::Twice,
        }
    }

    fn locate(self, case_dir: &Path) -> Option<ConverterCase> {
        let input = required(case_dir, INPUT_IMAGE)?;
        let output = case_dir.join(OUTPUT_IMAGE);
        Some(match self {
            ConverterCategory::Ok => ConverterCase::Ok {
                input,
                output,
                reference: case_dir.join(REFERENCE_IMAGE),
            },
            ConverterCategory::NotOk => ConverterCase::NotOk { input, output },
            ConverterCategory::Twice => ConverterCase::Twice {
                input,
                intermediate: output,
                output: case_dir.join(OUTPUT_TWICE_IMAGE),
            },
        })
    }
}

impl CaseFiles for ConverterCase {
    fn artifacts(&self) -> Vec<PathBuf> {
        match self {
            ConverterCase::Ok { output, .. } | ConverterCase::NotOk { output, .. } => {
                vec![output.clone()]
            }
            ConverterCase::Twice {
                intermediate,
                output,
                ..
            } => vec![intermediate.clone(), output.clone()],
        }
    }
}

/// One test case discovered on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase<F> {
    pub name: String,
    pub files: F,
}

impl<F: CaseFiles> TestCase<F> {
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.files.artifacts()
    }
}

/// Map a case directory to a test case
///
/// Returns `None` when the entry is not a directory or a required input is
/// missing; such entries are placeholders, not failures.
pub fn parse_case<K: CaseKind>(kind: K, case_dir: &Path) -> Option<TestCase<K::Files>> {
    if !case_dir.is_dir() {
        return None;
    }
    let name = case_dir.file_name()?.to_string_lossy().into_owned();
    let files = kind.locate(case_dir)?;
    Some(TestCase { name, files })
}

/// Cases of one category directory, in identifier order
#[derive(Debug)]
pub struct Fixtures<F> {
    pub cases: Vec<TestCase<F>>,
    /// Entries that did not qualify as a case
    pub skipped: usize,
}

impl<F> Default for Fixtures<F> {
    fn default() -> Self {
        Self {
            cases: Vec::new(),
            skipped: 0,
        }
    }
}

/// List the cases of a category directory
///
/// A missing directory is an empty category. Any other failure to read it
/// is a harness error.
pub fn enumerate<K: CaseKind>(kind: K, category_dir: &Path) -> Result<Fixtures<K::Files>> {
    let category = kind.category();
    let entries = match std::fs::read_dir(category_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(
                %category,
                path = %category_dir.display(),
                "Category directory does not exist, no cases to run"
            );
            return Ok(Fixtures::default());
        }
        Err(e) => return Err(Error::fixture_read(category_dir, e)),
    };

    let mut dirs = entries
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()
        .map_err(|e| Error::fixture_read(category_dir, e))?;
    dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut fixtures = Fixtures::default();
    for dir in dirs {
        match parse_case(kind, &dir) {
            Some(case) => fixtures.cases.push(case),
            None => {
                tracing::debug!(%category, path = %dir.display(), "Skipping incomplete fixture");
                fixtures.skipped += 1;
            }
        }
    }
    Ok(fixtures)
}
