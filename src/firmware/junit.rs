//! Verdict from the JUnit report written by the test runner.

use std::{fs, path::Path};

use log::info;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CiError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JunitSummary {
    pub tests: usize,
    pub errors: usize,
    pub failures: usize,
}
impl JunitSummary {
    pub fn passed(&self) -> bool {
        self.errors == 0 && self.failures == 0
    }
}

static ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(testcase|error|failure)[\s/>]").expect("Invalid JUnit element regex")
});

/// Count the test cases and their `<error>`/`<failure>` children.
pub fn summarize(xml: &str) -> JunitSummary {
    let mut summary = JunitSummary::default();
    for capture in ELEMENT.captures_iter(xml) {
        match &capture[1] {
            "testcase" => summary.tests += 1,
            "error" => summary.errors += 1,
            _ => summary.failures += 1,
        }
    }
    summary
}

/// Read the report at `path` and fail unless every test case passed.
pub fn check_report(path: &Path) -> Result<JunitSummary, CiError> {
    let xml = fs::read_to_string(path).map_err(CiError::file(path))?;
    let summary = summarize(&xml);
    info!(
        "{}: {} tests, {} errors, {} failures",
        path.display(),
        summary.tests,
        summary.errors,
        summary.failures
    );
    if summary.passed() {
        Ok(summary)
    } else {
        Err(CiError::TestsFailed {
            path: path.to_path_buf(),
            errors: summary.errors,
            failures: summary.failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"<?xml version="1.0" ?>
<testsuites>
  <testsuite errors="1" failures="1" name="test.K64F.GCC_ARM" tests="4">
    <testcase classname="test.K64F.GCC_ARM" name="MBED_A1" time="1.2"/>
    <testcase classname="test.K64F.GCC_ARM" name="MBED_A2" time="0.9">
      <error message="ERROR" type="ERROR">timeout</error>
    </testcase>
    <testcase classname="test.K64F.GCC_ARM" name="MBED_A3" time="3.0">
      <failure message="FAIL" type="FAIL"/>
    </testcase>
    <testcase classname="test.K64F.GCC_ARM" name="MBED_A4" time="0.1"></testcase>
  </testsuite>
</testsuites>
"#;

    #[test]
    fn counts_cases_and_problems() {
        assert_eq!(
            summarize(REPORT),
            JunitSummary {
                tests: 4,
                errors: 1,
                failures: 1
            }
        );
    }

    #[test]
    fn testsuite_is_not_a_testcase() {
        let summary = summarize("<testsuites><testsuite tests=\"0\"></testsuite></testsuites>");
        assert_eq!(summary, JunitSummary::default());
        assert!(summary.passed());
    }

    #[test]
    fn failing_report_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("K64F_junit_report.xml");
        fs::write(&path, REPORT).unwrap();
        assert!(matches!(
            check_report(&path),
            Err(CiError::TestsFailed {
                errors: 1,
                failures: 1,
                ..
            })
        ));
    }

    #[test]
    fn missing_report_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            check_report(&dir.path().join("none.xml")),
            Err(CiError::File { .. })
        ));
    }
}
