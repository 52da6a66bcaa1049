use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A 0.4 model with one input, one output, test tensors and torchscript
/// weights. Expects `test_input.npy`, `test_output.npy` and `weights.pt`
/// next to it.
pub const MINIMAL_MODEL_V04: &str = r#"format_version: "0.4.0"
type: model
name: unet2d
description: nucleus segmentation
authors:
  - name: Jane Doe
license: MIT
inputs:
  - name: raw
    axes: bcyx
    data_type: float32
    shape: [1, 1, 64, 64]
outputs:
  - name: mask
    axes: bcyx
    data_type: float32
    shape:
      reference_tensor: raw
      scale: [1.0, 1.0, 1.0, 1.0]
      offset: [0.0, 0.0, 0.0, 0.0]
test_inputs: [test_input.npy]
test_outputs: [test_output.npy]
weights:
  torchscript:
    source: weights.pt
"#;

/// The 0.5 counterpart of [`MINIMAL_MODEL_V04`], same files.
pub const MINIMAL_MODEL_V05: &str = r"format_version: 0.5.3
type: model
name: unet2d
description: nucleus segmentation
authors:
  - name: Jane Doe
license: MIT
inputs:
  - id: raw
    axes:
      - type: batch
      - type: channel
        channel_names: [raw]
      - type: space
        id: y
        size: 64
      - type: space
        id: x
        size: 64
    test_tensor:
      source: test_input.npy
outputs:
  - id: mask
    axes:
      - type: batch
      - type: channel
        channel_names: [mask]
      - type: space
        id: y
        size:
          tensor_id: raw
          axis_id: y
      - type: space
        id: x
        size:
          tensor_id: raw
          axis_id: x
    test_tensor:
      source: test_output.npy
weights:
  torchscript:
    source: weights.pt
";

/// Isolated directory holding a description and the files it references.
pub struct DescriptionFixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl Default for DescriptionFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptionFixture {
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self { temp_dir, root }
    }

    /// A directory with [`MINIMAL_MODEL_V04`] and its files.
    #[must_use]
    pub fn model_v04() -> Self {
        let fixture = Self::new();
        fixture.write_description(MINIMAL_MODEL_V04);
        fixture.write_model_files();
        fixture
    }

    /// A directory with [`MINIMAL_MODEL_V05`] and its files.
    #[must_use]
    pub fn model_v05() -> Self {
        let fixture = Self::new();
        fixture.write_description(MINIMAL_MODEL_V05);
        fixture.write_model_files();
        fixture
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write `content` at `relative_path`, creating parent directories.
    pub fn create_file(&self, relative_path: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let full_path = self.root.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    /// Write `rdf.yaml`.
    pub fn write_description(&self, yaml: &str) -> PathBuf {
        self.create_file("rdf.yaml", yaml)
    }

    pub fn remove_file(&self, relative_path: &str) {
        std::fs::remove_file(self.root.join(relative_path)).expect("Failed to remove file");
    }

    fn write_model_files(&self) {
        self.create_file("test_input.npy", b"\x93NUMPY input");
        self.create_file("test_output.npy", b"\x93NUMPY output");
        self.create_file("weights.pt", b"torchscript weights");
    }
}
