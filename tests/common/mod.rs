#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

pub const HEADER: &str = "Name,Age,Gender,Blood_Type,Medical_Condition,Date_of_Admission,Doctor,Hospital,Insurance_Provider,Billing_Amount,Room_Number,Admission_Type,Discharge_Date,Medication,Test_Results";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes a CSV with the canonical header followed by `rows`.
    pub fn write_admissions(&self, name: &str, rows: &[String]) -> PathBuf {
        let mut contents = String::from(HEADER);
        contents.push('\n');
        for row in rows {
            contents.push_str(row);
            contents.push('\n');
        }
        self.write(name, &contents)
    }
}

/// Builds one CSV row; unspecified columns keep plausible defaults.
pub struct RowBuilder {
    cells: Vec<String>,
}

impl RowBuilder {
    pub fn new() -> Self {
        let defaults = [
            "Pat Doe", "40", "Female", "O+", "Asthma", "2024-01-01", "Dr Who", "General",
            "Aetna", "1000.00", "101", "Elective", "2024-01-03", "Aspirin", "Normal",
        ];
        Self {
            cells: defaults.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn set(mut self, column: usize, value: &str) -> Self {
        self.cells[column] = value.to_string();
        self
    }

    pub fn name(self, value: &str) -> Self {
        self.set(0, value)
    }

    pub fn gender(self, value: &str) -> Self {
        self.set(2, value)
    }

    pub fn billing(self, value: &str) -> Self {
        self.set(9, value)
    }

    pub fn admission_type(self, value: &str) -> Self {
        self.set(11, value)
    }

    pub fn medication(self, value: &str) -> Self {
        self.set(13, value)
    }

    pub fn build(self) -> String {
        self.cells.join(",")
    }
}
