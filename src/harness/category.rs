//! Category runners
//!
//! Runs every case of one category in identifier order: clear stale output,
//! invoke the tool (twice for round trips), evaluate, print the verdict and
//! remove whatever the tool created.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::fixture::{
    self, CaseKind, Category, ComparerCase, ComparerCategory, ConverterCase, ConverterCategory,
    TestCase,
};
use super::process::{decode_lossy, Launcher};
use super::verdict::{verify_same_images, ExpectedOutcome, Failure, Mismatch, Verdict};
use crate::common::{Error, HarnessConfig, Result};

/// Executables under test, one variant per harness
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toolchain {
    /// Comparer checked on its own
    Comparer { comparer: PathBuf },
    /// Converter checked with the comparer as the judge of its output
    Converter { converter: PathBuf, comparer: PathBuf },
}

/// Per-category tally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryReport {
    pub category: Category,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Output files of a case that must not outlive it
///
/// Creating the guard removes stale files from earlier runs. `finish`
/// removes them again and reports errors; dropping an unfinished guard
/// (a harness error mid-case) still removes them, best effort.
struct ArtifactGuard {
    paths: Vec<PathBuf>,
    armed: bool,
}

impl ArtifactGuard {
    fn clear(paths: Vec<PathBuf>) -> Result<Self> {
        for path in &paths {
            remove_artifact(path)?;
        }
        Ok(Self { paths, armed: true })
    }

    fn finish(mut self) -> Result<()> {
        self.armed = false;
        for path in &self.paths {
            remove_artifact(path)?;
        }
        Ok(())
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if self.armed {
            for path in &self.paths {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

fn remove_artifact(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed output artifact");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::ArtifactCleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn read_expected_stderr(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    Ok(decode_lossy(&bytes))
}

/// Runs the cases of one category family
#[async_trait]
pub trait CaseRunner: Sync {
    type Kind: CaseKind;

    /// Invoke the tool for one case and judge what it did
    async fn evaluate(&self, files: &<Self::Kind as CaseKind>::Files) -> Result<Option<Failure>>;

    /// Run and evaluate a single case, leaving no artifacts behind
    async fn run_case(&self, case: &TestCase<<Self::Kind as CaseKind>::Files>) -> Result<Verdict> {
        let artifacts = ArtifactGuard::clear(case.artifacts())?;
        let failure = self.evaluate(&case.files).await?;
        artifacts.finish()?;
        Ok(Verdict::new(case.name.as_str(), failure.into()))
    }

    /// Run every case found in `category_dir`, printing one line per case
    async fn run(&self, kind: Self::Kind, category_dir: &Path) -> Result<CategoryReport> {
        let category = kind.category();
        let fixtures = fixture::enumerate(kind, category_dir)?;
        let mut report = CategoryReport {
            category,
            passed: 0,
            failed: 0,
            skipped: fixtures.skipped,
        };

        for case in &fixtures.cases {
            let verdict = self.run_case(case).await?;
            verdict.print();
            if verdict.passed() {
                report.passed += 1;
            } else {
                report.failed += 1;
            }
        }

        tracing::info!(
            %category,
            passed = report.passed,
            failed = report.failed,
            skipped = report.skipped,
            "Category finished"
        );
        Ok(report)
    }
}

/// Checks the comparer against the same and diff fixtures
pub struct ComparerRunner<'a> {
    launcher: &'a dyn Launcher,
    comparer: &'a Path,
    config: &'a HarnessConfig,
}

impl<'a> ComparerRunner<'a> {
    pub fn new(launcher: &'a dyn Launcher, comparer: &'a Path, config: &'a HarnessConfig) -> Self {
        Self {
            launcher,
            comparer,
            config,
        }
    }
}

#[async_trait]
impl<'a> CaseRunner for ComparerRunner<'a> {
    type Kind = ComparerCategory;

    async fn evaluate(&self, files: &ComparerCase) -> Result<Option<Failure>> {
        let (image1, image2, expected) = match files {
            ComparerCase::Same { image1, image2 } => {
                (image1, image2, ExpectedOutcome::same_images(self.config))
            }
            ComparerCase::Diff {
                image1,
                image2,
                expected_stderr,
            } => {
                let expected_stderr = expected_stderr
                    .as_deref()
                    .map(read_expected_stderr)
                    .transpose()?;
                let expected = ExpectedOutcome::different_images(self.config, expected_stderr);
                (image1, image2, expected)
            }
        };
        let result = self
            .launcher
            .run(self.comparer, &[image1.as_path(), image2.as_path()])
            .await?;
        Ok(expected.check(&result).map(Failure::run))
    }
}

/// Checks the converter against the ok, not_ok and twice fixtures
pub struct ConverterRunner<'a> {
    launcher: &'a dyn Launcher,
    converter: &'a Path,
    comparer: &'a Path,
    config: &'a HarnessConfig,
}

impl<'a> ConverterRunner<'a> {
    pub fn new(
        launcher: &'a dyn Launcher,
        converter: &'a Path,
        comparer: &'a Path,
        config: &'a HarnessConfig,
    ) -> Self {
        Self {
            launcher,
            converter,
            comparer,
            config,
        }
    }

    /// Run a conversion that is expected to succeed and produce `output`
    async fn convert(&self, input: &Path, output: &Path) -> Result<Option<Mismatch>> {
        let result = self.launcher.run(self.converter, &[input, output]).await?;
        if let Some(mismatch) = ExpectedOutcome::conversion_succeeded().check(&result) {
            return Ok(Some(mismatch));
        }
        if !output.exists() {
            return Ok(Some(Mismatch::ArtifactMissing));
        }
        Ok(None)
    }
}

#[async_trait]
impl<'a> CaseRunner for ConverterRunner<'a> {
    type Kind = ConverterCategory;

    async fn evaluate(&self, files: &ConverterCase) -> Result<Option<Failure>> {
        match files {
            ConverterCase::Ok {
                input,
                output,
                reference,
            } => {
                if let Some(mismatch) = self.convert(input, output).await? {
                    return Ok(Some(Failure::run(mismatch)));
                }
                verify_same_images(self.launcher, self.comparer, output, reference, self.config)
                    .await
            }

            ConverterCase::NotOk { input, output } => {
                let result = self
                    .launcher
                    .run(self.converter, &[input.as_path(), output.as_path()])
                    .await?;
                if let Some(mismatch) =
                    ExpectedOutcome::conversion_failed(self.config).check(&result)
                {
                    return Ok(Some(Failure::run(mismatch)));
                }
                if output.exists() {
                    return Ok(Some(Failure::run(Mismatch::ArtifactPresent)));
                }
                Ok(None)
            }

            ConverterCase::Twice {
                input,
                intermediate,
                output,
            } => {
                if let Some(mismatch) = self.convert(input, intermediate).await? {
                    return Ok(Some(Failure::run(mismatch)));
                }
                if let Some(mismatch) = self.convert(intermediate, output).await? {
                    return Ok(Some(Failure::second_run(mismatch)));
                }
                verify_same_images(self.launcher, self.comparer, input, output, self.config).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::fixture::{
        EXPECTED_STDERR, IMAGE_1, IMAGE_2, INPUT_IMAGE, OUTPUT_IMAGE, OUTPUT_TWICE_IMAGE,
        REFERENCE_IMAGE,
    };
    use crate::harness::process::ExecutionResult;
    use crate::harness::verdict::{Outcome, Stage};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    const COMPARER: &str = "/tools/comparer";
    const CONVERTER: &str = "/tools/converter";

    /// In-memory launcher that plays both tools
    struct Scripted<F> {
        script: F,
        calls: Mutex<Vec<PathBuf>>,
    }

    impl<F> Scripted<F> {
        fn new(script: F) -> Self {
            Self {
                script,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls_to(&self, program: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.as_path() == Path::new(program))
                .count()
        }
    }

    #[async_trait]
    impl<F> Launcher for Scripted<F>
    where
        F: Fn(&Path, &[&Path]) -> ExecutionResult + Send + Sync,
    {
        async fn run(&self, program: &Path, args: &[&Path]) -> Result<ExecutionResult> {
            self.calls.lock().unwrap().push(program.to_path_buf());
            Ok((self.script)(program, args))
        }
    }

    /// Byte-equality comparer and a converter that inverts everything after
    /// the `BM` signature
    fn reference_tools(program: &Path, args: &[&Path]) -> ExecutionResult {
        if program == Path::new(COMPARER) {
            let a = fs::read(args[0]).unwrap_or_default();
            let b = fs::read(args[1]).unwrap_or_default();
            if a.len() != b.len() {
                ExecutionResult::new(1, "", "Error: Images have different formats.")
            } else if a == b {
                ExecutionResult::new(0, "Images are same", "")
            } else {
                ExecutionResult::new(2, "", "pixel mismatch at (3,4)")
            }
        } else {
            let input = fs::read(args[0]).unwrap_or_default();
            if !input.starts_with(b"BM") {
                return ExecutionResult::new(1, "", "Error: Unable to read file.");
            }
            fs::write(args[1], invert(&input)).unwrap();
            ExecutionResult::new(0, "", "")
        }
    }

    fn invert(bytes: &[u8]) -> Vec<u8> {
        let mut out = bytes.to_vec();
        for b in &mut out[2..] {
            *b ^= 0xFF;
        }
        out
    }

    fn comparer_runner<'a>(
        launcher: &'a dyn Launcher,
        config: &'a HarnessConfig,
    ) -> ComparerRunner<'a> {
        ComparerRunner::new(launcher, Path::new(COMPARER), config)
    }

    fn converter_runner<'a>(
        launcher: &'a dyn Launcher,
        config: &'a HarnessConfig,
    ) -> ConverterRunner<'a> {
        ConverterRunner::new(launcher, Path::new(CONVERTER), Path::new(COMPARER), config)
    }

    fn write_case(dir: &Path, files: &[(&str, &[u8])]) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
        dir.to_path_buf()
    }

    fn diff_case(dir: &Path) -> TestCase<ComparerCase> {
        fixture::parse_case(ComparerCategory::Diff, dir).unwrap()
    }

    fn failure(verdict: &Verdict) -> Failure {
        match verdict.outcome {
            Outcome::Fail(failure) => failure,
            Outcome::Pass => panic!("Expected {} to fail", verdict.name),
        }
    }

    #[tokio::test]
    async fn test_same_category_runs_every_case() {
        let root = tempdir().unwrap();
        let same = root.path().join("same");
        write_case(&same.join("a"), &[(IMAGE_1, b"BM12"), (IMAGE_2, b"BM12")]);
        write_case(&same.join("b"), &[(IMAGE_1, b"BM12"), (IMAGE_2, b"BM13")]);
        write_case(&same.join("c"), &[(IMAGE_1, b"BM99"), (IMAGE_2, b"BM99")]);
        write_case(&same.join("placeholder"), &[(IMAGE_1, b"BM99")]);

        let launcher = Scripted::new(reference_tools);
        let config = HarnessConfig::default();
        let runner = comparer_runner(&launcher, &config);

        let report = runner.run(ComparerCategory::Same, &same).await.unwrap();
        assert_eq!(report.category, Category::Same);
        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(launcher.calls_to(COMPARER), 3);
    }

    #[tokio::test]
    async fn test_diff_stderr_policies() {
        let root = tempdir().unwrap();
        let diff = root.path().join("diff");
        let exact = write_case(
            &diff.join("exact"),
            &[
                (IMAGE_1, b"BM12"),
                (IMAGE_2, b"BM13"),
                (EXPECTED_STDERR, b"pixel mismatch at (3,4)\n"),
            ],
        );
        let wrong = write_case(
            &diff.join("wrong"),
            &[
                (IMAGE_1, b"BM12"),
                (IMAGE_2, b"BM13"),
                (EXPECTED_STDERR, b"pixel mismatch at (3, 4)"),
            ],
        );
        let formats = write_case(&diff.join("formats"), &[(IMAGE_1, b"BM1"), (IMAGE_2, b"BM13")]);
        let no_file = write_case(&diff.join("no_file"), &[(IMAGE_1, b"BM12"), (IMAGE_2, b"BM13")]);

        let launcher = Scripted::new(reference_tools);
        let config = HarnessConfig::default();
        let runner = comparer_runner(&launcher, &config);

        assert!(runner.run_case(&diff_case(&exact)).await.unwrap().passed());
        assert!(runner.run_case(&diff_case(&formats)).await.unwrap().passed());

        let verdict = runner.run_case(&diff_case(&wrong)).await.unwrap();
        assert_eq!(failure(&verdict), Failure::run(Mismatch::Stderr));

        let verdict = runner.run_case(&diff_case(&no_file)).await.unwrap();
        assert_eq!(
            failure(&verdict),
            Failure::run(Mismatch::ReturnCode {
                expected: 1,
                actual: 2
            })
        );
    }

    #[tokio::test]
    async fn test_diff_empty_output_txt_expects_differ_code() {
        let root = tempdir().unwrap();
        let case_dir = write_case(
            &root.path().join("diff/blank"),
            &[(IMAGE_1, b"BM1"), (IMAGE_2, b"BM13"), (EXPECTED_STDERR, b"")],
        );

        // Sizes differ, so the comparer answers with the totally-different code
        let launcher = Scripted::new(reference_tools);
        let config = HarnessConfig::default();
        let runner = comparer_runner(&launcher, &config);

        let verdict = runner.run_case(&diff_case(&case_dir)).await.unwrap();
        assert_eq!(verdict.to_string(), "FAILED blank: Return code 2 != 1");
    }

    #[tokio::test]
    async fn test_ok_case_compares_against_reference_and_cleans_up() {
        let root = tempdir().unwrap();
        let good = write_case(
            &root.path().join("ok/good"),
            &[(INPUT_IMAGE, b"BM\x01\x02"), (REFERENCE_IMAGE, b"BM\xfe\xfd")],
        );
        let bad_ref = write_case(
            &root.path().join("ok/bad_ref"),
            &[(INPUT_IMAGE, b"BM\x01\x02"), (REFERENCE_IMAGE, b"BM\x01\x02")],
        );

        let launcher = Scripted::new(reference_tools);
        let config = HarnessConfig::default();
        let runner = converter_runner(&launcher, &config);

        let case = fixture::parse_case(ConverterCategory::Ok, &good).unwrap();
        assert!(runner.run_case(&case).await.unwrap().passed());
        assert!(!good.join(OUTPUT_IMAGE).exists());

        let case = fixture::parse_case(ConverterCategory::Ok, &bad_ref).unwrap();
        let verdict = runner.run_case(&case).await.unwrap();
        assert_eq!(failure(&verdict).stage, Stage::Comparison);
        assert!(!bad_ref.join(OUTPUT_IMAGE).exists());
        assert_eq!(launcher.calls_to(CONVERTER), 2);
        assert_eq!(launcher.calls_to(COMPARER), 2);
    }

    #[tokio::test]
    async fn test_ok_case_without_output_skips_comparer() {
        let root = tempdir().unwrap();
        let case_dir = write_case(&root.path().join("ok/lazy"), &[(INPUT_IMAGE, b"BM\x01")]);

        let launcher = Scripted::new(|_: &Path, _: &[&Path]| ExecutionResult::new(0, "", ""));
        let config = HarnessConfig::default();
        let runner = converter_runner(&launcher, &config);

        let case = fixture::parse_case(ConverterCategory::Ok, &case_dir).unwrap();
        let verdict = runner.run_case(&case).await.unwrap();
        assert_eq!(failure(&verdict), Failure::run(Mismatch::ArtifactMissing));
        assert_eq!(launcher.calls_to(COMPARER), 0);
    }

    #[tokio::test]
    async fn test_not_ok_stale_output_is_removed_before_run() {
        let root = tempdir().unwrap();
        let case_dir = write_case(
            &root.path().join("not_ok/header"),
            &[(INPUT_IMAGE, b"XX"), (OUTPUT_IMAGE, b"stale")],
        );

        let launcher = Scripted::new(reference_tools);
        let config = HarnessConfig::default();
        let runner = converter_runner(&launcher, &config);

        let case = fixture::parse_case(ConverterCategory::NotOk, &case_dir).unwrap();
        assert!(runner.run_case(&case).await.unwrap().passed());
        assert!(!case_dir.join(OUTPUT_IMAGE).exists());
    }

    #[tokio::test]
    async fn test_not_ok_partial_artifact_fails_and_is_removed() {
        let root = tempdir().unwrap();
        let case_dir = write_case(&root.path().join("not_ok/partial"), &[(INPUT_IMAGE, b"XX")]);

        let launcher = Scripted::new(|_: &Path, args: &[&Path]| {
            fs::write(args[1], b"BM").unwrap();
            ExecutionResult::new(1, "", "Error: Failed to write pixel data.")
        });
        let config = HarnessConfig::default();
        let runner = converter_runner(&launcher, &config);

        let case = fixture::parse_case(ConverterCategory::NotOk, &case_dir).unwrap();
        let verdict = runner.run_case(&case).await.unwrap();
        assert_eq!(failure(&verdict), Failure::run(Mismatch::ArtifactPresent));
        assert_eq!(
            verdict.to_string(),
            "FAILED partial: output file created in incorrect scenario"
        );
        assert!(!case_dir.join(OUTPUT_IMAGE).exists());
    }

    #[tokio::test]
    async fn test_twice_round_trip() {
        let root = tempdir().unwrap();
        let case_dir = write_case(&root.path().join("twice/rt"), &[(INPUT_IMAGE, b"BM\x10\x20")]);
        let case = fixture::parse_case(ConverterCategory::Twice, &case_dir).unwrap();
        let config = HarnessConfig::default();

        let launcher = Scripted::new(reference_tools);
        let runner = converter_runner(&launcher, &config);
        assert!(runner.run_case(&case).await.unwrap().passed());
        assert_eq!(launcher.calls_to(CONVERTER), 2);
        assert!(!case_dir.join(OUTPUT_IMAGE).exists());
        assert!(!case_dir.join(OUTPUT_TWICE_IMAGE).exists());
        assert!(case_dir.join(INPUT_IMAGE).exists());

        // A converter that is not its own inverse breaks the round trip
        let lossy = Scripted::new(|program: &Path, args: &[&Path]| {
            if program == Path::new(CONVERTER) {
                fs::write(args[1], b"BM\x00\x00").unwrap();
                ExecutionResult::new(0, "", "")
            } else {
                reference_tools(program, args)
            }
        });
        let runner = converter_runner(&lossy, &config);
        let verdict = runner.run_case(&case).await.unwrap();
        assert_eq!(
            failure(&verdict),
            Failure::comparison(Mismatch::ReturnCode {
                expected: 0,
                actual: 2
            })
        );
        assert!(!case_dir.join(OUTPUT_TWICE_IMAGE).exists());
    }

    #[tokio::test]
    async fn test_twice_second_conversion_failure() {
        let root = tempdir().unwrap();
        let case_dir = write_case(&root.path().join("twice/half"), &[(INPUT_IMAGE, b"BM\x10\x20")]);
        let case = fixture::parse_case(ConverterCategory::Twice, &case_dir).unwrap();
        let config = HarnessConfig::default();

        // Converts the original input but rejects its own output
        let launcher = Scripted::new(|program: &Path, args: &[&Path]| {
            if program == Path::new(CONVERTER) && args[0].ends_with(OUTPUT_IMAGE) {
                ExecutionResult::new(1, "", "Error: Unable to read file.")
            } else {
                reference_tools(program, args)
            }
        });
        let runner = converter_runner(&launcher, &config);

        let verdict = runner.run_case(&case).await.unwrap();
        assert_eq!(failure(&verdict).stage, Stage::SecondRun);
        assert_eq!(
            failure(&verdict),
            Failure::second_run(Mismatch::ReturnCode {
                expected: 0,
                actual: 1
            })
        );
        assert_eq!(
            verdict.to_string(),
            "FAILED half: second conversion: Return code 0 != 1"
        );
        assert_eq!(launcher.calls_to(CONVERTER), 2);
        assert_eq!(launcher.calls_to(COMPARER), 0);
        assert!(!case_dir.join(OUTPUT_IMAGE).exists());
        assert!(!case_dir.join(OUTPUT_TWICE_IMAGE).exists());

        // Exiting 0 without writing the second file is also a second-run failure
        let silent = Scripted::new(|program: &Path, args: &[&Path]| {
            if program == Path::new(CONVERTER) && args[0].ends_with(OUTPUT_IMAGE) {
                ExecutionResult::new(0, "", "")
            } else {
                reference_tools(program, args)
            }
        });
        let runner = converter_runner(&silent, &config);
        let verdict = runner.run_case(&case).await.unwrap();
        assert_eq!(
            failure(&verdict),
            Failure::second_run(Mismatch::ArtifactMissing)
        );
        assert_eq!(silent.calls_to(COMPARER), 0);
        assert!(!case_dir.join(OUTPUT_IMAGE).exists());
    }

    #[tokio::test]
    async fn test_empty_category_is_vacuous_pass() {
        let root = tempdir().unwrap();
        let twice = root.path().join("twice");
        fs::create_dir_all(&twice).unwrap();

        let launcher = Scripted::new(reference_tools);
        let config = HarnessConfig::default();
        let runner = converter_runner(&launcher, &config);

        let report = runner.run(ConverterCategory::Twice, &twice).await.unwrap();
        assert_eq!(report.category, Category::Twice);
        assert_eq!((report.passed, report.failed, report.skipped), (0, 0, 0));
    }
}
