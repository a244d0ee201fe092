//! Reference converter for integration testing
//!
//! `mock_converter <input> <output>` writes the negative of `input` to
//! `output`. On any failure it exits 1 with a diagnostic on stderr and
//! leaves no output file behind.

use std::path::Path;
use std::process::ExitCode;

use conformance::bmp::Bitmap;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [input, output] = args.as_slice() else {
        eprintln!("Error: Expected an input and an output path.");
        return ExitCode::FAILURE;
    };

    let mut image = match Bitmap::read(Path::new(input)) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: Unable to read file: {e}");
            return ExitCode::FAILURE;
        }
    };
    image.invert();

    let output = Path::new(output);
    if let Err(e) = image.write(output) {
        eprintln!("Error: Failed to write new data: {e}");
        let _ = std::fs::remove_file(output);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
